//! SQL migration runner
//!
//! Migration units are plain `*.sql` files applied in ascending file-name
//! order. Applied units are recorded in the `schema_migrations` ledger.
//! Each pending unit runs in its own transaction together with its ledger
//! insert, so a unit is either fully applied and recorded or not at all.
//!
//! Re-running the migrator is a no-op for units already in the ledger,
//! which makes it safe to call on every deploy.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::{Executor, SqlitePool};

use crate::error::AppError;
use crate::metrics::MIGRATIONS_APPLIED_TOTAL;

const CREATE_LEDGER_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    filename TEXT PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

/// One named schema change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// Sort key and ledger key (the file name, e.g. `0001_create_tweets.sql`)
    pub name: String,
    /// Opaque SQL text, may hold several statements
    pub sql: String,
}

impl MigrationUnit {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// A row of the ledger
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntry {
    pub filename: String,
    pub applied_at: DateTime<Utc>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Units known to this run
    pub total: usize,
    /// Units skipped because the ledger already had them
    pub skipped: usize,
    /// Units applied by this run, in order
    pub applied: Vec<String>,
}

/// Applies a fixed, ordered set of migration units
#[derive(Debug, Clone)]
pub struct Migrator {
    units: Vec<MigrationUnit>,
}

impl Migrator {
    /// Create a migrator; units are sorted by name
    pub fn new(mut units: Vec<MigrationUnit>) -> Self {
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Self { units }
    }

    /// Load every `*.sql` file in `dir`
    ///
    /// # Errors
    /// Returns `MigrationSource` if the directory or any file cannot be
    /// read. Nothing touches the database before this succeeds.
    pub async fn from_dir(dir: &Path) -> Result<Self, AppError> {
        let source_error = |path: PathBuf| {
            move |source: std::io::Error| AppError::MigrationSource { path, source }
        };

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(source_error(dir.to_path_buf()))?;

        let mut units = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(source_error(dir.to_path_buf()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                tracing::warn!(path = %path.display(), "Skipping migration with non UTF-8 name");
                continue;
            };
            let name = name.to_string();

            let sql = tokio::fs::read_to_string(&path)
                .await
                .map_err(source_error(path.clone()))?;
            units.push(MigrationUnit::new(name, sql));
        }

        Ok(Self::new(units))
    }

    /// Units in application order
    pub fn units(&self) -> &[MigrationUnit] {
        &self.units
    }

    /// Bring the schema up to date
    ///
    /// Stops at the first failing unit and returns its error. Units applied
    /// before the failure stay applied and recorded.
    pub async fn run(&self, pool: &SqlitePool) -> Result<MigrationReport, AppError> {
        ensure_ledger(pool).await?;
        let applied = applied_names(pool).await?;

        tracing::info!(
            found = self.units.len(),
            applied = applied.len(),
            "Checking migrations"
        );

        let mut report = MigrationReport {
            total: self.units.len(),
            ..MigrationReport::default()
        };

        for unit in &self.units {
            if applied.contains(&unit.name) {
                report.skipped += 1;
                continue;
            }

            tracing::info!(name = %unit.name, "Applying migration");
            apply_unit(pool, unit).await?;
            MIGRATIONS_APPLIED_TOTAL.inc();
            report.applied.push(unit.name.clone());
        }

        tracing::info!(
            applied = report.applied.len(),
            skipped = report.skipped,
            "Migrations complete"
        );

        Ok(report)
    }
}

/// Create the ledger table if it is missing
pub async fn ensure_ledger(pool: &SqlitePool) -> Result<(), AppError> {
    pool.execute(CREATE_LEDGER_SQL).await?;
    Ok(())
}

/// Names of every applied unit
pub async fn applied_names(pool: &SqlitePool) -> Result<HashSet<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>("SELECT filename FROM schema_migrations")
        .fetch_all(pool)
        .await?;
    Ok(names.into_iter().collect())
}

/// Full ledger in name order
pub async fn ledger(pool: &SqlitePool) -> Result<Vec<LedgerEntry>, AppError> {
    ensure_ledger(pool).await?;
    let entries = sqlx::query_as::<_, LedgerEntry>(
        "SELECT filename, applied_at FROM schema_migrations ORDER BY filename",
    )
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

/// Run one unit and its ledger insert in a single transaction
async fn apply_unit(pool: &SqlitePool, unit: &MigrationUnit) -> Result<(), AppError> {
    let migration_error = |source: sqlx::Error| AppError::Migration {
        name: unit.name.clone(),
        source,
    };

    let mut tx = pool.begin().await.map_err(migration_error)?;

    let result = async {
        (&mut *tx).execute(unit.sql.as_str()).await?;
        sqlx::query("INSERT INTO schema_migrations (filename) VALUES (?)")
            .bind(&unit.name)
            .execute(&mut *tx)
            .await?;
        Ok::<(), sqlx::Error>(())
    }
    .await;

    match result {
        Ok(()) => tx.commit().await.map_err(migration_error),
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::error!(
                    name = %unit.name,
                    error = %rollback_error,
                    "Rollback after failed migration also failed"
                );
            }
            tracing::error!(name = %unit.name, %error, "Migration failed");
            Err(migration_error(error))
        }
    }
}
