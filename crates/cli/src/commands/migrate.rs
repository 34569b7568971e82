//! Database migration command.
//!
//! Applies the embedded migrations from `crates/api/migrations/` and creates
//! the `tower_sessions.session` table used by the API's session store.

use festiv_api::db;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, database_url};

/// Errors from `festiv migrate`.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete");
    Ok(())
}
