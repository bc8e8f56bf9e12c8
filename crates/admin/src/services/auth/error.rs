//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and user management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] gazetteer_core::EmailError),

    /// Password doesn't meet the minimum requirements.
    #[error("password must be at least {min} characters")]
    WeakPassword {
        /// Minimum accepted length.
        min: usize,
    },

    /// Unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("account is inactive")]
    Inactive,

    /// A user with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Hashing a password failed.
    #[error("failed to hash password")]
    PasswordHash,

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
