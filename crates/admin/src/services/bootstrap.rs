//! Seeding the first administrator.
//!
//! The secrets file is a small JSON document:
//!
//! ```json
//! { "admin_username": "admin@example.org", "admin_password": "..." }
//! ```
//!
//! Seeding is idempotent: if a user with that email exists it is left alone.
//! A new administrator is created in a single transaction, so a failed seed
//! leaves nothing behind and can simply be retried.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use gazetteer_core::{Email, RoleName, ValueError};

use super::auth::{AuthError, hash_new_password};
use crate::db::{RepositoryError, lock_name_scope, roles, users};
use crate::models::User;

/// Name of the role given to the seeded administrator.
pub const ADMIN_ROLE: &str = "admin";

const SEED_SCOPE: &str = "gazetteer.admin.seed";

/// Errors that can occur while seeding the administrator.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The secrets file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The secrets file is not valid JSON of the expected shape.
    #[error("invalid secrets file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Creating the user failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The role name is invalid.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Administrator credentials read from the secrets file.
#[derive(Debug, Deserialize)]
pub struct AdminSecrets {
    /// Login email of the administrator.
    pub admin_username: String,
    /// Plain-text password, hashed before storage.
    pub admin_password: SecretString,
}

impl AdminSecrets {
    /// Parse secrets from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::Parse` if the JSON is malformed or incomplete.
    pub fn from_json(json: &str) -> Result<Self, BootstrapError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a secrets file.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::Io` if the file cannot be read and
    /// `BootstrapError::Parse` if its contents are invalid.
    pub async fn load(path: &Path) -> Result<Self, BootstrapError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BootstrapError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }
}

/// What [`seed_admin`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// A new administrator was created.
    Created(User),
    /// A user with the configured email already existed.
    AlreadyPresent(User),
}

/// Create the administrator described by `secrets` unless it already exists.
///
/// The new user is active, confirmed and holds the `admin` role, which is
/// created if missing. All of it commits together or not at all.
///
/// # Errors
///
/// Returns `BootstrapError::Auth` if the email or password is invalid, or
/// `BootstrapError::Repository` on database failures.
pub async fn seed_admin(
    pool: &PgPool,
    secrets: &AdminSecrets,
) -> Result<SeedOutcome, BootstrapError> {
    let email = Email::parse(&secrets.admin_username).map_err(AuthError::from)?;
    let role_name = RoleName::parse(ADMIN_ROLE)?;

    let mut tx = pool.begin().await.map_err(RepositoryError::from)?;
    lock_name_scope(&mut tx, SEED_SCOPE)
        .await
        .map_err(RepositoryError::from)?;

    if let Some(existing) = users::find_by_email(&mut tx, &email).await? {
        tracing::info!(user_id = %existing.id, "Administrator already present");
        return Ok(SeedOutcome::AlreadyPresent(existing));
    }

    let password_hash = hash_new_password(secrets.admin_password.expose_secret())?;
    let user = users::insert(&mut tx, &email, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => BootstrapError::Auth(AuthError::UserAlreadyExists),
            other => BootstrapError::Repository(other),
        })?;
    let user = users::mark_confirmed(&mut tx, user.id).await?;

    let role = roles::find_or_create(&mut tx, &role_name, Some("Administrator")).await?;
    users::grant_role(&mut tx, user.id, role.id).await?;

    tx.commit().await.map_err(RepositoryError::from)?;

    tracing::info!(user_id = %user.id, "Administrator seeded");
    Ok(SeedOutcome::Created(user))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secrets() {
        let secrets = AdminSecrets::from_json(
            r#"{"admin_username": "root@example.org", "admin_password": "hunter2hunter2"}"#,
        )
        .unwrap();
        assert_eq!(secrets.admin_username, "root@example.org");
        assert_eq!(secrets.admin_password.expose_secret(), "hunter2hunter2");
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let secrets = AdminSecrets::from_json(
            r#"{"admin_username": "root@example.org", "admin_password": "hunter2hunter2"}"#,
        )
        .unwrap();
        assert!(!format!("{secrets:?}").contains("hunter2"));
    }

    #[test]
    fn test_missing_field() {
        let err = AdminSecrets::from_json(r#"{"admin_username": "root@example.org"}"#).unwrap_err();
        assert!(matches!(err, BootstrapError::Parse(_)));
    }
}
