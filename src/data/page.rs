//! Keyset pagination over tweets
//!
//! Pages are ordered by `(created_at DESC, id DESC)`. `id` is unique, so the
//! pair is a strict total order even when many rows share a `created_at`,
//! and the row-value comparison `(created_at, id) < (?, ?)` resumes exactly
//! after the last row of the previous page: no gaps, no repeats.

use sqlx::{QueryBuilder, Sqlite};

use super::cursor::Cursor;
use super::models::{Tweet, normalize_timestamp};

/// Smallest page a client may ask for
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest page a client may ask for
pub const MAX_PAGE_SIZE: u32 = 50;
/// Page size when the client does not ask
pub const DEFAULT_PAGE_SIZE: u32 = 20;

const TWEET_COLUMNS: &str =
    "id, title, content, author, url, tweet_id, created_at, updated_at";

/// One page request: where to resume, what to match, how many rows
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    /// Substring matched against title, content and author, ignoring case
    /// in every script (via the lower-cased `search_text` column)
    pub search: Option<String>,
    pub limit: u32,
}

impl PageRequest {
    /// Unfiltered listing
    pub fn listing(cursor: Option<Cursor>, limit: u32) -> Self {
        Self {
            cursor,
            search: None,
            limit,
        }
    }

    /// Substring search
    pub fn search(query: impl Into<String>, cursor: Option<Cursor>, limit: u32) -> Self {
        Self {
            cursor,
            search: Some(query.into()),
            limit,
        }
    }

    /// Seek position in storage form, if the cursor is usable
    ///
    /// A cursor whose timestamp does not parse is dropped here and the
    /// request starts from the first page.
    fn anchor(&self) -> Option<(String, String)> {
        let cursor = self.cursor.as_ref()?;
        match normalize_timestamp(&cursor.created_at) {
            Some(created_at) => Some((created_at, cursor.id.clone())),
            None => {
                tracing::debug!(
                    created_at = %cursor.created_at,
                    "Ignoring cursor with unparseable timestamp"
                );
                None
            }
        }
    }

    /// Build the bounded, ordered SELECT for this page
    ///
    /// The search predicate and the cursor seek are ANDed in a single
    /// statement, so both constraints hold for every returned row.
    pub fn build_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(TWEET_COLUMNS);
        query.push(" FROM tweets");

        let mut has_where = false;

        if let Some(search) = &self.search {
            query.push(" WHERE search_text LIKE ");
            query.push_bind(like_pattern(&search.to_lowercase()));
            query.push(" ESCAPE '\\'");
            has_where = true;
        }

        if let Some((created_at, id)) = self.anchor() {
            query.push(if has_where { " AND " } else { " WHERE " });
            query.push("(created_at, id) < (");
            query.push_bind(created_at);
            query.push(", ");
            query.push_bind(id);
            query.push(")");
        }

        query.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query.push_bind(i64::from(self.limit));

        query
    }
}

/// `%term%` with LIKE metacharacters escaped, so the term matches literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// A page of results plus the cursor for the page after it
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl Page<Tweet> {
    /// Wrap fetched rows
    ///
    /// A full page (`items.len() == limit`) gets a cursor after its last
    /// row. A short page is the end of the data and gets none. When the
    /// final page happens to be exactly full, the next request returns an
    /// empty page without a cursor.
    pub fn from_rows(items: Vec<Tweet>, limit: u32) -> Self {
        let next_cursor = match items.last() {
            Some(last) if items.len() == limit as usize => Some(Cursor::after(last).encode()),
            _ => None,
        };

        Self { items, next_cursor }
    }
}
