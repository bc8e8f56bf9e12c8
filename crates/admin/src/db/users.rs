//! User repository and role assignment.
//!
//! Password hashes are only read by [`UserRepository::get_with_password_hash`];
//! every other query returns [`User`] without one.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use gazetteer_core::{Email, RoleId, UserId};

use super::RepositoryError;
use crate::models::{Role, User};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    active: bool,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            active: row.active,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
    description: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for users and their roles.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a user from an already-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, email, password_hash).await
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, active, confirmed_at, created_at
            FROM gazetteer.app_user
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_by_email(&mut conn, email).await
    }

    /// Get a user and their password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT id, email, active, confirmed_at, created_at, password_hash
            FROM gazetteer.app_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| -> Result<_, RepositoryError> {
            Ok((User::try_from(r.user)?, r.password_hash))
        })
        .transpose()
    }

    /// List all users ordered by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any stored email is invalid.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, active, confirmed_at, created_at
            FROM gazetteer.app_user
            ORDER BY email
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Activate or deactivate a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE gazetteer.app_user
            SET active = $2
            WHERE id = $1
            RETURNING id, email, active, confirmed_at, created_at
            ",
        )
        .bind(id.as_i32())
        .bind(active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Mark a user as confirmed. Keeps the first confirmation time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn confirm(&self, id: UserId) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        mark_confirmed(&mut conn, id).await
    }

    /// Delete a user and their role assignments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM gazetteer.app_user WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Roles held by a user, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn roles_for(&self, id: UserId) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r"
            SELECT r.id, r.name, r.description
            FROM gazetteer.role r
            JOIN gazetteer.user_role ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name, r.id
            ",
        )
        .bind(id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Role {
                id: RoleId::new(row.id),
                name: row.name,
                description: row.description,
            })
            .collect())
    }

    /// Give a role to a user. Assigning a held role is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user or role doesn't exist.
    pub async fn assign_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        grant_role(&mut conn, user, role).await
    }

    /// Take a role away from a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user did not hold the role.
    pub async fn revoke_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM gazetteer.user_role WHERE user_id = $1 AND role_id = $2",
        )
        .bind(user.as_i32())
        .bind(role.as_i32())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

pub(crate) async fn insert(
    conn: &mut PgConnection,
    email: &Email,
    password_hash: &str,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(
        r"
        INSERT INTO gazetteer.app_user (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email, active, confirmed_at, created_at
        ",
    )
    .bind(email.as_str())
    .bind(password_hash)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "email already registered", "user conflict"))?;

    row.try_into()
}

pub(crate) async fn find_by_email(
    conn: &mut PgConnection,
    email: &Email,
) -> Result<Option<User>, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(
        r"
        SELECT id, email, active, confirmed_at, created_at
        FROM gazetteer.app_user
        WHERE email = $1
        ",
    )
    .bind(email.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Keeps the first confirmation time.
pub(crate) async fn mark_confirmed(
    conn: &mut PgConnection,
    id: UserId,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(
        r"
        UPDATE gazetteer.app_user
        SET confirmed_at = COALESCE(confirmed_at, NOW())
        WHERE id = $1
        RETURNING id, email, active, confirmed_at, created_at
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    row.try_into()
}

pub(crate) async fn grant_role(
    conn: &mut PgConnection,
    user: UserId,
    role: RoleId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO gazetteer.user_role (user_id, role_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(user.as_i32())
    .bind(role.as_i32())
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        RepositoryError::from_write(e, "role already assigned", "user or role does not exist")
    })?;

    Ok(())
}
