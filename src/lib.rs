//! TweetVault - a small saved-posts service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - GET  /api/tweets, /api/tweets/search, /api/tweets/:id    │
//! │  - POST /api/tweets, DELETE /api/tweets/:id (API key)       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Cursor decoding, tweet ID extraction                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Keyset page queries                                      │
//! │  - SQL migration runner + schema_migrations ledger          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Database, pagination and migrations
//! - `auth`: API key check
//! - `rate_limit`: Per-client request limits
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod rate_limit;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and rate limiters.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Limiter applied to every request
    pub rate_limiter: Arc<rate_limit::RateLimiter>,

    /// Additional limiter for write requests
    pub write_limiter: Arc<rate_limit::RateLimiter>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Apply migrations if `database.migrate_on_startup` is set
    /// 3. Build rate limiters
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db =
            data::Database::connect(&config.database.path, config.database.max_connections)
                .await?;

        if config.database.migrate_on_startup {
            let report = db.migrate(&config.database.migrations_dir).await?;
            tracing::info!(
                applied = report.applied.len(),
                skipped = report.skipped,
                "Startup migrations finished"
            );
        }

        let window = Duration::from_secs(config.rate_limit.window_seconds);
        let rate_limiter = rate_limit::RateLimiter::new(config.rate_limit.max_requests, window);
        let write_limiter =
            rate_limit::RateLimiter::new(config.rate_limit.write_max_requests, window);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            rate_limiter: Arc::new(rate_limiter),
            write_limiter: Arc::new(write_limiter),
        })
    }

    /// Release shared resources
    ///
    /// Call after the server has stopped accepting requests.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::tweets_router())
        .merge(api::metrics_router(state.clone()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_requests,
        ))
        .layer(middleware::from_fn(api::track_requests))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    let Some(origins) = server.cors_origins() else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "ok": true }))
}

/// Install the global tracing subscriber
///
/// `TWEETVAULT__LOGGING__FORMAT=json` selects JSON lines; anything else is pretty.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_format =
        std::env::var("TWEETVAULT__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tweetvault=info,tower_http=debug".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
