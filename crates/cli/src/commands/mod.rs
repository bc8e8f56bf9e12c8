//! Command implementations.

pub mod address;
pub mod admin;
pub mod migrate;
pub mod role;
pub mod user;

use gazetteer_admin::config::{AppConfig, ConfigError};
use gazetteer_admin::db::{self, RepositoryError};
use gazetteer_admin::services::{AuthError, BootstrapError, DirectoryError};
use gazetteer_core::ValueError;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Directory operation failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// User creation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Administrator seeding failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Invalid input value.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A named entity doesn't exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A destructive command was run without confirmation.
    #[error("refusing to {0} without --yes")]
    NotConfirmed(&'static str),
}

/// Load configuration and connect to the database.
async fn connect() -> Result<(AppConfig, PgPool), CommandError> {
    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, pool))
}
