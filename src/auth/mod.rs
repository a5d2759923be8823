//! API key authentication
//!
//! Write endpoints and `/metrics` require the `x-api-key` header.

mod api_key;

pub use api_key::{API_KEY_HEADER, ApiKey, require_api_key};
