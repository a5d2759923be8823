//! Opaque keyset cursor
//!
//! A cursor is the base64url-encoded JSON object
//! `{"createdAt": "<RFC 3339>", "id": "<id>"}` naming the last row a client
//! has seen. The server keeps no pagination state; the cursor is all of it.
//!
//! Cursors come straight from query strings, so decoding never fails:
//! anything unreadable decodes to `None`, which the caller treats as
//! "start from the first page".

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::models::{Tweet, format_timestamp};

/// Accepts base64url with or without trailing `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Position in the `(created_at DESC, id DESC)` order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub created_at: String,
    pub id: String,
}

impl Cursor {
    /// Cursor pointing just past `tweet`
    pub fn after(tweet: &Tweet) -> Self {
        Self {
            created_at: format_timestamp(&tweet.created_at),
            id: tweet.id.clone(),
        }
    }

    /// Encode to the URL-safe wire form
    pub fn encode(&self) -> String {
        // Serializing two strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a client-supplied cursor
    ///
    /// # Returns
    /// `None` for missing, empty, non-base64, non-JSON, or incomplete input
    pub fn decode(raw: Option<&str>) -> Option<Self> {
        let raw = raw?;
        if raw.is_empty() {
            return None;
        }

        let bytes = URL_SAFE_LENIENT.decode(raw).ok()?;
        let cursor: Cursor = serde_json::from_slice(&bytes).ok()?;

        if cursor.created_at.is_empty() || cursor.id.is_empty() {
            tracing::debug!("Ignoring cursor with empty fields");
            return None;
        }

        Some(cursor)
    }
}
