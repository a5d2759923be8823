//! Apply pending SQL migrations and exit
//!
//! Run once per deploy, before starting the server. Exits non-zero if any
//! migration fails; units applied before the failure stay applied.

use std::process::ExitCode;

use tweetvault::config::AppConfig;
use tweetvault::data::{Database, Migrator, migrate};
use tweetvault::error::AppError;

#[tokio::main]
async fn main() -> ExitCode {
    tweetvault::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Migration run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::load_database()?;

    // Read every unit before opening any transaction.
    let migrator = Migrator::from_dir(&config.migrations_dir).await?;
    tracing::info!(
        dir = %config.migrations_dir.display(),
        units = migrator.units().len(),
        "Loaded migrations"
    );

    let db = Database::connect(&config.path, config.max_connections).await?;
    let result = apply(&migrator, &db).await;

    db.close().await;
    result
}

async fn apply(migrator: &Migrator, db: &Database) -> Result<(), AppError> {
    let report = migrator.run(db.pool()).await?;
    for name in &report.applied {
        tracing::info!(%name, "Applied");
    }
    db.backfill_search_text().await?;

    if let Some(latest) = migrate::ledger(db.pool()).await?.last() {
        tracing::info!(
            latest = %latest.filename,
            applied_at = %latest.applied_at,
            "Schema is up to date"
        );
    }

    Ok(())
}
