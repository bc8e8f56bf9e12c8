//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! gz-cli migrate
//! gz-cli reset --yes
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations live in `crates/admin/migrations/` and are embedded in the admin
//! crate, so the CLI and the server always agree on the schema.

use gazetteer_admin::db;

use super::{CommandError, connect};

/// Run pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

/// Drop the schema and migrate from scratch.
///
/// # Errors
///
/// Returns `CommandError::NotConfirmed` unless `yes` is set.
pub async fn reset(yes: bool) -> Result<(), CommandError> {
    if !yes {
        return Err(CommandError::NotConfirmed("drop the gazetteer schema"));
    }

    let (_, pool) = connect().await?;
    db::reset_schema(&pool).await?;

    tracing::info!("Schema reset complete!");
    Ok(())
}
