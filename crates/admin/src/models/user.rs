//! User and role domain types.
//!
//! Password hashes never leave the repository layer except through
//! [`crate::db::UserRepository::get_with_password_hash`].

use chrono::{DateTime, Utc};
use serde::Serialize;

use gazetteer_core::{Email, RoleId, UserId};

/// A directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email (unique).
    pub email: Email,
    /// Inactive users cannot log in.
    pub active: bool,
    /// When the account was confirmed, if ever.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

/// A role that can be assigned to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    /// Unique role ID.
    pub id: RoleId,
    /// Role name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
}
