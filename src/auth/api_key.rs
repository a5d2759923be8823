//! `x-api-key` header check
//!
//! A single shared key, configured as `auth.api_key`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;

/// Header carrying the key
pub const API_KEY_HEADER: &str = "x-api-key";

fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|h| h.to_str().ok())
}

/// Compare without short-circuiting on the first differing byte
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

fn authorize(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    match extract_api_key(headers) {
        Some(provided) if keys_match(provided, expected) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

/// Extractor proving the request carried the configured API key
///
/// # Usage
/// ```ignore
/// async fn handler(_key: ApiKey) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        authorize(&parts.headers, &state.config.auth.api_key)?;
        Ok(ApiKey)
    }
}

/// Middleware requiring the API key on every route it wraps
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(request.headers(), &state.config.auth.api_key)?;
    Ok(next.run(request).await)
}
