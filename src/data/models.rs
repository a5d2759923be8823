//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Parse a client-supplied ID, rejecting anything that is not a ULID
    pub fn parse(raw: &str) -> Option<Self> {
        ulid::Ulid::from_string(raw.trim())
            .ok()
            .map(|ulid| Self(ulid.to_string()))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Canonical storage form of a timestamp: RFC 3339, UTC, millisecond precision
///
/// Example: "2024-01-01T00:00:00.000Z"
///
/// Every stored `created_at`/`updated_at` uses this exact shape so that
/// text comparison in SQL agrees with chronological order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any RFC 3339 timestamp and re-render it in canonical form
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| format_timestamp(&parsed.with_timezone(&Utc)))
}

// =============================================================================
// Tweet
// =============================================================================

/// A saved post
///
/// `url` is the natural key: saving the same URL again updates the
/// existing row and keeps its `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tweet {
    pub id: String,
    pub title: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub url: String,
    /// Numeric status ID parsed from `url`, if any
    pub tweet_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for an insert-or-update by URL
#[derive(Debug, Clone)]
pub struct NewTweet {
    pub title: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub url: String,
    pub tweet_id: Option<String>,
}

impl NewTweet {
    pub fn search_text(&self) -> String {
        search_text(self.title.as_deref(), &self.content, self.author.as_deref())
    }
}

/// Separates fields in `search_text` so a match never spans two of them
const SEARCH_FIELD_SEPARATOR: char = '\u{1f}';

/// Lower-cased searchable fields, as stored in the `search_text` column
///
/// Uses Unicode lower-casing, so "Été" and "ÉTÉ" both become "été".
pub fn search_text(title: Option<&str>, content: &str, author: Option<&str>) -> String {
    let mut text = String::with_capacity(content.len() + 64);
    text.push_str(&title.unwrap_or_default().to_lowercase());
    text.push(SEARCH_FIELD_SEPARATOR);
    text.push_str(&content.to_lowercase());
    text.push(SEARCH_FIELD_SEPARATOR);
    text.push_str(&author.unwrap_or_default().to_lowercase());
    text
}
