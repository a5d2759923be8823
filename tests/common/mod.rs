//! Common test utilities for E2E tests

use std::net::SocketAddr;
use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tweetvault::{AppState, config};

/// Key configured on every test server
pub const TEST_API_KEY: &str = "test-api-key-0123456789";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(customize: impl FnOnce(&mut config::AppConfig)) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                cors_origin: "*".to_string(),
            },
            database: config::DatabaseConfig {
                path: db_path,
                max_connections: 5,
                migrations_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
                migrate_on_startup: true,
            },
            auth: config::AuthConfig {
                api_key: TEST_API_KEY.to_string(),
            },
            rate_limit: config::RateLimitConfig {
                max_requests: 1000,
                write_max_requests: 1000,
                window_seconds: 60,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        customize(&mut config);

        // Initialize app state (applies migrations)
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = tweetvault::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// POST a tweet with the API key and return the response
    pub async fn post_tweet(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/tweets"))
            .header("x-api-key", TEST_API_KEY)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Create `count` tweets with distinct URLs and return their ids
    pub async fn seed_tweets(&self, count: usize, content: &str) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let response = self
                .post_tweet(&json!({
                    "content": format!("{content} #{i}"),
                    "url": format!("https://x.com/seed/status/{}", 1000 + i),
                }))
                .await;
            assert_eq!(response.status(), 201);
            let json: Value = response.json().await.unwrap();
            ids.push(json["item"]["id"].as_str().unwrap().to_string());
        }
        ids
    }

    /// Follow `nextCursor` from `path` until it runs out
    ///
    /// Returns the size of every page and the ids in the order served.
    pub async fn walk_pages(&self, path: &str) -> (Vec<usize>, Vec<String>) {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut sizes = Vec::new();
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let url = match &cursor {
                Some(cursor) => self.url(&format!("{path}{separator}cursor={cursor}")),
                None => self.url(path),
            };
            let response = self.client.get(url).send().await.unwrap();
            assert_eq!(response.status(), 200);

            let json: Value = response.json().await.unwrap();
            let items = json["items"].as_array().unwrap();
            sizes.push(items.len());
            ids.extend(
                items
                    .iter()
                    .map(|item| item["id"].as_str().unwrap().to_string()),
            );

            match json["nextCursor"].as_str() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
            assert!(sizes.len() < 100, "pagination did not terminate");
        }

        (sizes, ids)
    }
}
