//! Administrator bootstrap command.
//!
//! # Usage
//!
//! ```bash
//! gz-cli admin seed --secrets secrets.json
//! ```
//!
//! The secrets file holds `admin_username` (an email) and `admin_password`.
//! Running the command twice is harmless.

use std::path::Path;

use gazetteer_admin::services::{AdminSecrets, SeedOutcome, seed_admin};

use super::{CommandError, connect};

/// Seed the administrator from `secrets`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or the user cannot be created.
pub async fn seed(secrets: &Path) -> Result<(), CommandError> {
    let secrets = AdminSecrets::load(secrets).await?;
    let (_, pool) = connect().await?;

    match seed_admin(&pool, &secrets).await? {
        SeedOutcome::Created(user) => {
            tracing::info!("Administrator {} created (id {})", user.email, user.id);
        }
        SeedOutcome::AlreadyPresent(user) => {
            tracing::info!("Administrator {} already exists, nothing to do", user.email);
        }
    }
    Ok(())
}
