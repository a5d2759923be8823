//! API layer
//!
//! HTTP handlers for:
//! - Tweets API (list, search, get, save, delete)
//! - Request metrics middleware
//! - Metrics (Prometheus)

mod dto;
pub mod metrics;
mod tweets;

pub use dto::*;

use axum::{Router, routing::get};

use crate::AppState;

pub use metrics::{metrics_router, track_requests};

/// Create tweets API router
///
/// Reads are public; `post` and `delete` handlers check the API key themselves.
/// `/tweets/search` is a static segment and wins over `/tweets/:id`.
pub fn tweets_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tweets",
            get(tweets::list_tweets).post(tweets::create_tweet),
        )
        .route("/tweets/search", get(tweets::search_tweets))
        .route(
            "/tweets/:id",
            get(tweets::get_tweet).delete(tweets::delete_tweet),
        )
}
