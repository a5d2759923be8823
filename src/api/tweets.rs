//! Tweet endpoints

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::StatusCode,
};

use super::dto::{
    CreateTweetRequest, DeleteResponse, ListParams, SearchParams, TweetItemResponse,
    TweetListResponse, TweetResponse,
};
use crate::AppState;
use crate::auth::ApiKey;
use crate::error::{AppError, FieldIssue};
use crate::rate_limit::client_key;
use crate::service::TweetService;

fn invalid_query(_: QueryRejection) -> AppError {
    AppError::Validation("Invalid query".to_string())
}

/// POST /api/tweets
///
/// Saves a tweet, updating the existing row when the URL is already known.
pub async fn create_tweet(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    _key: ApiKey,
    payload: Result<Json<CreateTweetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TweetItemResponse>), AppError> {
    state
        .write_limiter
        .check_and_increment(&client_key(connect_info.as_ref()))
        .await?;

    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "Rejected tweet body");
        AppError::InvalidBody(vec![FieldIssue::new("body", rejection.body_text())])
    })?;
    let tweet = payload.validate()?;

    let service = TweetService::new(state.db.clone());
    let saved = service
        .save(tweet.title, tweet.content, tweet.author, tweet.url)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TweetItemResponse {
            item: TweetResponse::from(saved),
        }),
    ))
}

/// GET /api/tweets
pub async fn list_tweets(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<TweetListResponse>, AppError> {
    let Query(params) = params.map_err(invalid_query)?;
    let limit = params.limit()?;

    let service = TweetService::new(state.db.clone());
    let page = service.list(params.cursor.as_deref(), limit).await?;

    Ok(Json(TweetListResponse::from(page)))
}

/// GET /api/tweets/search
///
/// Case-insensitive substring match on title, content and author,
/// paged in the same newest-first order as the listing.
pub async fn search_tweets(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<TweetListResponse>, AppError> {
    let Query(params) = params.map_err(invalid_query)?;
    let query = params.query()?;
    let limit = params.limit()?;

    let service = TweetService::new(state.db.clone());
    let page = service
        .search(&query, params.cursor.as_deref(), limit)
        .await?;

    Ok(Json(TweetListResponse::from(page)))
}

/// GET /api/tweets/:id
pub async fn get_tweet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TweetItemResponse>, AppError> {
    let service = TweetService::new(state.db.clone());
    let tweet = service.get(&id).await?;

    Ok(Json(TweetItemResponse {
        item: TweetResponse::from(tweet),
    }))
}

/// DELETE /api/tweets/:id
pub async fn delete_tweet(
    State(state): State<AppState>,
    _key: ApiKey,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let service = TweetService::new(state.db.clone());
    let deleted = service.delete(&id).await?;

    Ok(Json(DeleteResponse { ok: true, deleted }))
}
