//! Database operations for the gazetteer `PostgreSQL` schema.
//!
//! ## Tables (schema `gazetteer`)
//!
//! - `address` - Self-referential address forest
//! - `name_to_address` - Append-only name registry
//! - `full_name_to_address` - Append-only materialized full names
//! - `item` - Catalog items attached to one address
//! - `app_user`, `role`, `user_role` - Identity and role assignment
//! - `session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations live in `crates/admin/migrations/` and are embedded in
//! [`MIGRATOR`]. Run them via:
//! ```bash
//! cargo run -p gazetteer-cli -- migrate
//! ```

pub mod addresses;
pub mod full_names;
pub mod items;
pub mod names;
pub mod roles;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use full_names::FullNameRepository;
pub use items::ItemRepository;
pub use names::NameRepository;
pub use roles::RoleRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique name, dangling or blocking reference).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Translate constraint violations into [`RepositoryError::Conflict`].
    ///
    /// `unique` and `reference` describe the violated rule for the caller.
    pub(crate) fn from_write(e: sqlx::Error, unique: &str, reference: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(unique.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(reference.to_owned());
            }
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run pending migrations.
///
/// # Errors
///
/// Returns the migration error if any migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Drop the whole schema and the migration ledger, then migrate from scratch.
///
/// Destroys all data. Only meant for development and demo deployments.
///
/// # Errors
///
/// Returns the migration error if dropping or re-running migrations fails.
pub async fn reset_schema(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::warn!("Dropping schema gazetteer and all of its data");

    let mut tx = pool.begin().await?;
    sqlx::query("DROP SCHEMA IF EXISTS gazetteer CASCADE")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    migrate(pool).await?;
    tracing::info!("Schema recreated");
    Ok(())
}

/// Serialize writers that check a name for uniqueness before inserting it.
///
/// The lock is transaction-scoped and keyed by `scope`, so it is released on
/// commit or rollback.
pub(crate) async fn lock_name_scope(
    conn: &mut sqlx::PgConnection,
    scope: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(scope)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
