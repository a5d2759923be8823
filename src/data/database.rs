//! SQLite database operations
//!
//! All database access goes through this module.

use std::path::Path;
use std::str::FromStr;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::migrate::{MigrationReport, Migrator};
use super::models::*;
use super::page::{Page, PageRequest};
use crate::error::AppError;
use crate::metrics::start_db_query;

/// Database connection pool wrapper
///
/// The pool is created once per process. Call [`Database::close`] during
/// shutdown so every connection is released before exit.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file (and its parent directory) if needed.
    /// Does not run migrations; see [`Database::migrate`].
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    /// * `max_connections` - Pool size
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}", path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        tracing::info!(path = %path.display(), max_connections, "Database connected");

        Ok(Self { pool })
    }

    /// Apply pending migrations from `dir`, then backfill `search_text`
    pub async fn migrate(&self, dir: &Path) -> Result<MigrationReport, AppError> {
        let migrator = Migrator::from_dir(dir).await?;
        let report = migrator.run(&self.pool).await?;
        self.backfill_search_text().await?;
        Ok(report)
    }

    /// Fill `search_text` for rows that predate the column
    ///
    /// SQL `lower()` only folds ASCII, so the values are computed here.
    ///
    /// # Returns
    /// Number of rows updated
    pub async fn backfill_search_text(&self) -> Result<u64, AppError> {
        let _timer = start_db_query("UPDATE", "tweets");
        let rows = sqlx::query_as::<_, (String, Option<String>, String, Option<String>)>(
            "SELECT id, title, content, author FROM tweets WHERE search_text IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for (id, title, content, author) in &rows {
            sqlx::query("UPDATE tweets SET search_text = ? WHERE id = ?")
                .bind(search_text(title.as_deref(), content, author.as_deref()))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(rows = rows.len(), "Backfilled search text");
        Ok(rows.len() as u64)
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection
    ///
    /// Waits for checked-out connections to be returned first.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    // =========================================================================
    // Tweets
    // =========================================================================

    /// Insert a tweet, or update the existing one with the same URL
    ///
    /// On conflict the row keeps its `id` and `created_at`; the other
    /// fields are replaced and `updated_at` advances.
    pub async fn upsert_tweet(&self, tweet: &NewTweet) -> Result<Tweet, AppError> {
        let _timer = start_db_query("UPSERT", "tweets");
        let now = format_timestamp(&Utc::now());

        let row = sqlx::query_as::<_, Tweet>(
            r#"
            INSERT INTO tweets (id, title, content, author, url, tweet_id, search_text, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (url) DO UPDATE
            SET title = excluded.title,
                content = excluded.content,
                author = excluded.author,
                tweet_id = excluded.tweet_id,
                search_text = excluded.search_text,
                updated_at = excluded.updated_at
            RETURNING id, title, content, author, url, tweet_id, created_at, updated_at
            "#,
        )
        .bind(EntityId::new().0)
        .bind(&tweet.title)
        .bind(&tweet.content)
        .bind(&tweet.author)
        .bind(&tweet.url)
        .bind(&tweet.tweet_id)
        .bind(tweet.search_text())
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Get a tweet by ID
    pub async fn get_tweet(&self, id: &str) -> Result<Option<Tweet>, AppError> {
        let _timer = start_db_query("SELECT", "tweets");
        let tweet = sqlx::query_as::<_, Tweet>(
            "SELECT id, title, content, author, url, tweet_id, created_at, updated_at FROM tweets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tweet)
    }

    /// Delete a tweet by ID
    ///
    /// # Returns
    /// Number of rows removed (0 or 1)
    pub async fn delete_tweet(&self, id: &str) -> Result<u64, AppError> {
        let _timer = start_db_query("DELETE", "tweets");
        let result = sqlx::query("DELETE FROM tweets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Fetch one page in `(created_at DESC, id DESC)` order
    ///
    /// A single read with no explicit transaction; concurrent inserts may
    /// show up on later pages but rows are never skipped or repeated.
    pub async fn tweet_page(&self, request: &PageRequest) -> Result<Page<Tweet>, AppError> {
        let _timer = start_db_query("SELECT", "tweets");
        let mut query = request.build_query();
        let rows = query
            .build_query_as::<Tweet>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::from_rows(rows, request.limit))
    }
}
