//! Tweet service
//!
//! Saving, listing, searching and deleting tweets.

use std::sync::Arc;

use crate::data::{Cursor, Database, EntityId, NewTweet, Page, PageRequest, Tweet};
use crate::error::AppError;

/// Tweet service
pub struct TweetService {
    db: Arc<Database>,
}

impl TweetService {
    /// Create new tweet service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Save a tweet, keyed by URL
    ///
    /// The numeric status ID is pulled out of the URL when present.
    pub async fn save(
        &self,
        title: Option<String>,
        content: String,
        author: Option<String>,
        url: String,
    ) -> Result<Tweet, AppError> {
        let tweet_id = extract_tweet_id(&url);
        let tweet = self
            .db
            .upsert_tweet(&NewTweet {
                title,
                content,
                author,
                url,
                tweet_id,
            })
            .await?;

        tracing::info!(id = %tweet.id, url = %tweet.url, "Tweet saved");
        Ok(tweet)
    }

    /// Newest-first listing
    ///
    /// # Arguments
    /// * `cursor` - Raw cursor from the client; unreadable cursors restart at page one
    /// * `limit` - Page size, already validated by the caller
    pub async fn list(&self, cursor: Option<&str>, limit: u32) -> Result<Page<Tweet>, AppError> {
        let request = PageRequest::listing(Cursor::decode(cursor), limit);
        self.db.tweet_page(&request).await
    }

    /// Newest-first substring search over title, content and author
    pub async fn search(
        &self,
        query: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<Tweet>, AppError> {
        let request = PageRequest::search(query, Cursor::decode(cursor), limit);
        self.db.tweet_page(&request).await
    }

    /// Fetch one tweet
    ///
    /// # Errors
    /// `Validation` if `id` is not a valid identifier, `NotFound` if no row has it
    pub async fn get(&self, id: &str) -> Result<Tweet, AppError> {
        let id = EntityId::parse(id).ok_or_else(invalid_id)?;
        self.db.get_tweet(&id.0).await?.ok_or(AppError::NotFound)
    }

    /// Delete by ID
    ///
    /// # Returns
    /// Number of rows removed
    ///
    /// # Errors
    /// `Validation` if `id` is not a valid identifier
    pub async fn delete(&self, id: &str) -> Result<u64, AppError> {
        let id = EntityId::parse(id).ok_or_else(invalid_id)?;
        let deleted = self.db.delete_tweet(&id.0).await?;

        tracing::info!(id = %id.0, deleted, "Tweet delete requested");
        Ok(deleted)
    }
}

fn invalid_id() -> AppError {
    AppError::Validation("Invalid id".to_string())
}

/// Numeric status ID from an X/Twitter status URL
///
/// Supports `https://x.com/<user>/status/<id>`, the twitter.com form, and
/// trailing query strings. Returns the first digit run after `/status/`.
pub fn extract_tweet_id(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/status/")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() { None } else { Some(digits) }
}
