//! E2E tests for the tweets API

mod common;

use std::collections::HashSet;

use common::{TEST_API_KEY, TestServer};
use serde_json::{Value, json};

#[tokio::test]
async fn test_create_requires_api_key() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(&server.url("/api/tweets"))
        .json(&json!({ "content": "hello", "url": "https://x.com/a/status/1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = server
        .client
        .post(&server.url("/api/tweets"))
        .header("x-api-key", "wrong-key-wrong-key-wrong")
        .json(&json!({ "content": "hello", "url": "https://x.com/a/status/1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_create_tweet() {
    let server = TestServer::new().await;

    let response = server
        .post_tweet(&json!({
            "title": "  A title  ",
            "content": "Some content",
            "author": "alice",
            "url": "https://x.com/alice/status/1234567890?s=20",
        }))
        .await;
    assert_eq!(response.status(), 201);

    let json: Value = response.json().await.unwrap();
    let item = &json["item"];
    assert!(item["id"].is_string());
    assert_eq!(item["title"], "A title");
    assert_eq!(item["content"], "Some content");
    assert_eq!(item["author"], "alice");
    assert_eq!(item["tweetId"], "1234567890");
    assert!(item["createdAt"].as_str().unwrap().ends_with('Z'));
    assert_eq!(item["createdAt"], item["updatedAt"]);
}

#[tokio::test]
async fn test_create_same_url_updates_existing() {
    let server = TestServer::new().await;
    let url = "https://x.com/alice/status/77";

    let first: Value = server
        .post_tweet(&json!({ "content": "first", "url": url }))
        .await
        .json()
        .await
        .unwrap();
    let second: Value = server
        .post_tweet(&json!({ "content": "second", "url": url }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(first["item"]["id"], second["item"]["id"]);
    assert_eq!(first["item"]["createdAt"], second["item"]["createdAt"]);
    assert_eq!(second["item"]["content"], "second");

    let listing: Value = server
        .client
        .get(&server.url("/api/tweets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_invalid_bodies() {
    let server = TestServer::new().await;

    let invalid = [
        json!({ "content": "   ", "url": "https://x.com/a/status/1" }),
        json!({ "content": "ok", "url": "ftp://x.com/a" }),
        json!({ "content": "ok", "url": "not a url" }),
        json!({ "content": "ok" }),
        json!({ "content": "x".repeat(4001), "url": "https://x.com/a/status/1" }),
        json!({ "title": "t".repeat(281), "content": "ok", "url": "https://x.com/a/status/1" }),
    ];

    for body in &invalid {
        let response = server.post_tweet(body).await;
        assert_eq!(response.status(), 400, "body: {body}");
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["error"]["message"], "Invalid request body");
        assert!(!json["error"]["issues"].as_array().unwrap().is_empty());
    }

    let response = server
        .client
        .post(&server.url("/api/tweets"))
        .header("x-api-key", TEST_API_KEY)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_write_rate_limit() {
    let server = TestServer::with_config(|config| {
        config.rate_limit.write_max_requests = 2;
    })
    .await;

    for i in 0..2 {
        let response = server
            .post_tweet(&json!({ "content": "ok", "url": format!("https://x.com/a/status/{i}") }))
            .await;
        assert_eq!(response.status(), 201);
    }

    let response = server
        .post_tweet(&json!({ "content": "ok", "url": "https://x.com/a/status/9" }))
        .await;
    assert_eq!(response.status(), 429);

    // Reads are only subject to the global limit
    let response = server
        .client
        .get(&server.url("/api/tweets"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_list_empty() {
    let server = TestServer::new().await;

    let json: Value = server
        .client
        .get(&server.url("/api/tweets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(json["items"], json!([]));
    assert!(json["nextCursor"].is_null());
}

#[tokio::test]
async fn test_list_pagination_walks_every_tweet_once() {
    let server = TestServer::new().await;
    let created = server.seed_tweets(25, "post").await;

    let (sizes, ids) = server.walk_pages("/api/tweets?limit=10").await;

    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(ids.len(), 25);
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 25);
    assert_eq!(unique, created.iter().collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let server = TestServer::new().await;
    server.seed_tweets(5, "post").await;

    let json: Value = server
        .client
        .get(&server.url("/api/tweets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let keys: Vec<(String, String)> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| {
            (
                item["createdAt"].as_str().unwrap().to_string(),
                item["id"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(keys, sorted);
    assert!(json["nextCursor"].is_null());
}

#[tokio::test]
async fn test_list_exactly_full_last_page() {
    let server = TestServer::new().await;
    server.seed_tweets(20, "post").await;

    let (sizes, ids) = server.walk_pages("/api/tweets?limit=10").await;

    assert_eq!(sizes, vec![10, 10, 0]);
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_list_garbage_cursor_returns_first_page() {
    let server = TestServer::new().await;
    server.seed_tweets(3, "post").await;

    for cursor in ["not-base64!!", "bm90IGpzb24", ""] {
        let response = server
            .client
            .get(&server.url(&format!("/api/tweets?cursor={cursor}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "cursor: {cursor:?}");
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["items"].as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn test_list_rejects_invalid_limit() {
    let server = TestServer::new().await;

    for limit in ["0", "51", "-1", "abc"] {
        let response = server
            .client
            .get(&server.url(&format!("/api/tweets?limit={limit}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "limit: {limit}");
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["error"]["message"], "Invalid query");
    }

    let response = server
        .client
        .get(&server.url("/api/tweets?limit=50"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_search_requires_query() {
    let server = TestServer::new().await;

    for path in [
        "/api/tweets/search",
        "/api/tweets/search?q=",
        "/api/tweets/search?q=%20%20",
    ] {
        let response = server.client.get(&server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "path: {path}");
    }

    let long = "a".repeat(201);
    let response = server
        .client
        .get(&server.url(&format!("/api/tweets/search?q={long}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_search_matches_and_pages() {
    let server = TestServer::new().await;
    let rust = server.seed_tweets(7, "Learning Rust").await;

    // Distinct URLs from the seeded set
    for i in 0..4 {
        let response = server
            .post_tweet(&json!({
                "content": format!("Something else {i}"),
                "url": format!("https://x.com/other/status/{i}"),
            }))
            .await;
        assert_eq!(response.status(), 201);
    }
    let response = server
        .post_tweet(&json!({
            "content": "No keyword in the body",
            "author": "rustacean",
            "url": "https://x.com/rustacean/status/5",
        }))
        .await;
    assert_eq!(response.status(), 201);

    let (sizes, ids) = server.walk_pages("/api/tweets/search?q=rust&limit=3").await;

    assert_eq!(sizes, vec![3, 3, 2]);
    assert_eq!(ids.len(), 8);
    let ids: HashSet<_> = ids.into_iter().collect();
    assert!(rust.iter().all(|id| ids.contains(id)));
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let server = TestServer::new().await;
    server.seed_tweets(3, "plain").await;
    let response = server
        .post_tweet(&json!({ "content": "100% sure", "url": "https://x.com/p/status/1" }))
        .await;
    assert_eq!(response.status(), 201);

    let json: Value = server
        .client
        .get(&server.url("/api/tweets/search?q=%25"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["content"], "100% sure");
}

#[tokio::test]
async fn test_delete_tweet() {
    let server = TestServer::new().await;
    let ids = server.seed_tweets(2, "post").await;

    let response = server
        .client
        .delete(&server.url(&format!("/api/tweets/{}", ids[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = server
        .client
        .delete(&server.url(&format!("/api/tweets/{}", ids[0])))
        .header("x-api-key", TEST_API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json, json!({ "ok": true, "deleted": 1 }));

    // Second delete is a no-op
    let json: Value = server
        .client
        .delete(&server.url(&format!("/api/tweets/{}", ids[0])))
        .header("x-api-key", TEST_API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["deleted"], 0);

    let (_, remaining) = server.walk_pages("/api/tweets").await;
    assert_eq!(remaining, vec![ids[1].clone()]);
}

#[tokio::test]
async fn test_delete_rejects_invalid_id() {
    let server = TestServer::new().await;

    let response = server
        .client
        .delete(&server.url("/api/tweets/not-an-id"))
        .header("x-api-key", TEST_API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_create_lists_every_failed_field() {
    let server = TestServer::new().await;

    let response = server
        .post_tweet(&json!({
            "title": "   ",
            "content": "",
            "author": "a".repeat(101),
            "url": "javascript:alert(1)",
        }))
        .await;
    assert_eq!(response.status(), 400);

    let json: Value = response.json().await.unwrap();
    let fields: Vec<_> = json["error"]["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, ["title", "author", "content", "url"]);
    assert!(json["error"]["issues"][0]["message"].is_string());
}

#[tokio::test]
async fn test_create_rejects_oversized_body() {
    let server = TestServer::new().await;

    let response = server
        .post_tweet(&json!({
            "content": "x".repeat(70 * 1024),
            "url": "https://x.com/a/status/1",
        }))
        .await;
    assert_eq!(response.status(), 400);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"]["issues"][0]["field"], "body");
}

#[tokio::test]
async fn test_get_tweet_by_id() {
    let server = TestServer::new().await;
    let ids = server.seed_tweets(1, "single").await;

    let response = server
        .client
        .get(&server.url(&format!("/api/tweets/{}", ids[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["item"]["id"], ids[0].as_str());
    assert_eq!(json["item"]["content"], "single #0");

    // Well-formed but unknown id
    let response = server
        .client
        .get(&server.url("/api/tweets/01ARZ3NDEKTSV4RRFFQ69G5FAV"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"]["message"], "Resource not found");

    let response = server
        .client
        .get(&server.url("/api/tweets/not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_search_ignores_case_in_any_script() {
    let server = TestServer::new().await;
    let response = server
        .post_tweet(&json!({
            "title": "Été à Paris",
            "content": "Привет мир",
            "url": "https://x.com/u/status/1",
        }))
        .await;
    assert_eq!(response.status(), 201);
    server.seed_tweets(2, "ascii only").await;

    for q in ["%C3%89T%C3%89", "%D0%9F%D0%A0%D0%98%D0%92%D0%95%D0%A2"] {
        let json: Value = server
            .client
            .get(&server.url(&format!("/api/tweets/search?q={q}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let items = json["items"].as_array().unwrap();
        assert_eq!(items.len(), 1, "q: {q}");
        assert_eq!(items[0]["content"], "Привет мир");
    }
}
