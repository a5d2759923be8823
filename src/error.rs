//! Error types for TweetVault
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// One failed field of a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application-wide error type
///
/// Covers the HTTP request path as well as the migration runner.
/// Request-path variants map to a status code in `into_response`;
/// migration variants only ever reach the `migrate` binary or startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Missing or wrong API key (401)
    #[error("Unauthorized")]
    Unauthorized,

    /// Validation error (400)
    #[error("{0}")]
    Validation(String),

    /// Request body failed validation (400); lists every failed field
    #[error("Invalid request body")]
    InvalidBody(Vec<FieldIssue>),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration unit failed; its transaction was rolled back
    #[error("Migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    /// The migration directory or one of its files could not be read
    #[error("Failed to read migrations from {}: {source}", path.display())]
    MigrationSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded")]
    RateLimited,
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Server-side failures never leak their detail to the client.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::InvalidBody(_) => (StatusCode::BAD_REQUEST, self.to_string(), "validation"),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                self.to_string(),
                "rate_limited",
            ),
            AppError::Database(error) => {
                tracing::error!(%error, "Database error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    "database",
                )
            }
            AppError::Migration { .. } | AppError::MigrationSource { .. } => {
                tracing::error!(error = %self, "Migration error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    "migration",
                )
            }
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
                "config",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL
            .with_label_values(&[error_type, "unknown"])
            .inc();

        let body = match &self {
            AppError::InvalidBody(issues) => Json(serde_json::json!({
                "error": {
                    "message": error_message,
                    "issues": issues,
                },
            })),
            _ => Json(serde_json::json!({
                "error": {
                    "message": error_message,
                },
            })),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
