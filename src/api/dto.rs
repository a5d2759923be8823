//! Request and response DTOs
//!
//! Wire shapes for the tweets API. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::data::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, Page, Tweet, format_timestamp};
use crate::error::{AppError, FieldIssue};

const MAX_TITLE_CHARS: usize = 280;
const MAX_CONTENT_CHARS: usize = 4000;
const MAX_AUTHOR_CHARS: usize = 100;
const MAX_URL_CHARS: usize = 2048;
const MAX_QUERY_CHARS: usize = 200;

/// Tweet as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub id: String,
    pub title: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub url: String,
    pub tweet_id: Option<String>,
    /// RFC 3339, UTC, millisecond precision
    pub created_at: String,
    pub updated_at: String,
}

impl From<Tweet> for TweetResponse {
    fn from(tweet: Tweet) -> Self {
        Self {
            id: tweet.id,
            title: tweet.title,
            content: tweet.content,
            author: tweet.author,
            url: tweet.url,
            tweet_id: tweet.tweet_id,
            created_at: format_timestamp(&tweet.created_at),
            updated_at: format_timestamp(&tweet.updated_at),
        }
    }
}

/// `{"item": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct TweetItemResponse {
    pub item: TweetResponse,
}

/// One page: `{"items": [...], "nextCursor": "..." | null}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetListResponse {
    pub items: Vec<TweetResponse>,
    pub next_cursor: Option<String>,
}

impl From<Page<Tweet>> for TweetListResponse {
    fn from(page: Page<Tweet>) -> Self {
        Self {
            items: page.items.into_iter().map(TweetResponse::from).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

/// `{"ok": true, "deleted": n}`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub deleted: u64,
}

// =============================================================================
// Requests
// =============================================================================

/// POST /api/tweets body
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetRequest {
    pub title: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub url: String,
}

/// A create request that passed validation, with whitespace trimmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTweet {
    pub title: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub url: String,
}

fn trimmed_within(value: &str, max_chars: usize) -> Option<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    (1..=max_chars).contains(&len).then(|| trimmed.to_string())
}

fn length_issue(field: &str, max_chars: usize) -> FieldIssue {
    FieldIssue::new(field, format!("must be 1 to {max_chars} characters after trimming"))
}

impl CreateTweetRequest {
    /// Trim and bound every field
    ///
    /// `title` and `author` may be absent but not blank. Every failing
    /// field is reported, not just the first.
    pub fn validate(self) -> Result<ValidatedTweet, AppError> {
        let mut issues = Vec::new();

        let mut optional = |value: Option<String>, field: &str, max_chars: usize| match value {
            Some(value) => {
                let trimmed = trimmed_within(&value, max_chars);
                if trimmed.is_none() {
                    issues.push(length_issue(field, max_chars));
                }
                trimmed
            }
            None => None,
        };
        let title = optional(self.title, "title", MAX_TITLE_CHARS);
        let author = optional(self.author, "author", MAX_AUTHOR_CHARS);

        let content = trimmed_within(&self.content, MAX_CONTENT_CHARS);
        if content.is_none() {
            issues.push(length_issue("content", MAX_CONTENT_CHARS));
        }

        let url = match trimmed_within(&self.url, MAX_URL_CHARS) {
            None => {
                issues.push(length_issue("url", MAX_URL_CHARS));
                None
            }
            Some(url) => match url::Url::parse(&url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(url),
                _ => {
                    issues.push(FieldIssue::new("url", "must be an absolute http(s) URL"));
                    None
                }
            },
        };

        match (content, url) {
            (Some(content), Some(url)) if issues.is_empty() => Ok(ValidatedTweet {
                title,
                content,
                author,
                url,
            }),
            _ => Err(AppError::InvalidBody(issues)),
        }
    }
}

fn invalid_query() -> AppError {
    AppError::Validation("Invalid query".to_string())
}

fn validate_limit(limit: Option<u32>) -> Result<u32, AppError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&limit) {
        Ok(limit)
    } else {
        Err(invalid_query())
    }
}

/// GET /api/tweets query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl ListParams {
    /// Page size, defaulting to 20 and bounded to 1..=50
    pub fn limit(&self) -> Result<u32, AppError> {
        validate_limit(self.limit)
    }
}

/// GET /api/tweets/search query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl SearchParams {
    pub fn limit(&self) -> Result<u32, AppError> {
        validate_limit(self.limit)
    }

    /// Trimmed search text, 1..=200 characters
    pub fn query(&self) -> Result<String, AppError> {
        self.q
            .as_deref()
            .and_then(|q| trimmed_within(q, MAX_QUERY_CHARS))
            .ok_or_else(invalid_query)
    }
}
