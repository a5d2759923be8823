//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Keyset cursor codec and page queries
//! - SQL migration runner

mod cursor;
mod database;
pub mod migrate;
mod models;
mod page;

pub use cursor::Cursor;
pub use database::Database;
pub use migrate::{LedgerEntry, MigrationReport, MigrationUnit, Migrator};
pub use models::*;
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE, Page, PageRequest};
