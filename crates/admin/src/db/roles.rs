//! Role repository.

use sqlx::{PgConnection, PgPool};

use gazetteer_core::{RoleId, RoleName};

use super::{RepositoryError, lock_name_scope};
use crate::models::Role;

const NAME_SCOPE: &str = "gazetteer.role.name";

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: i32,
    name: String,
    description: Option<String>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: RoleId::new(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

/// Repository for roles.
pub struct RoleRepository<'a> {
    pool: &'a PgPool,
    unique_names: bool,
}

impl<'a> RoleRepository<'a> {
    /// Create a new role repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, unique_names: bool) -> Self {
        Self { pool, unique_names }
    }

    /// Create a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if names must be unique and this one
    /// is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &RoleName,
        description: Option<&str>,
    ) -> Result<Role, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if self.unique_names {
            lock_name_scope(&mut tx, NAME_SCOPE).await?;
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM gazetteer.role WHERE name = $1)",
            )
            .bind(name.as_str())
            .fetch_one(&mut *tx)
            .await?;

            if taken {
                return Err(RepositoryError::Conflict(format!(
                    "role '{name}' already exists"
                )));
            }
        }

        let row = sqlx::query_as::<_, RoleRow>(
            r"
            INSERT INTO gazetteer.role (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            ",
        )
        .bind(name.as_str())
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Get a role by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description FROM gazetteer.role WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get the oldest role carrying `name`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError> {
        let row = sqlx::query_as::<_, RoleRow>(
            r"
            SELECT id, name, description
            FROM gazetteer.role
            WHERE name = $1
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List all roles ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, description FROM gazetteer.role ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a role. Assignments are removed with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the role doesn't exist.
    pub async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM gazetteer.role WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

/// The oldest role named `name`, created with `description` if none exists.
///
/// Serialized with role creation through the name lock, so concurrent
/// callers agree on one role.
pub(crate) async fn find_or_create(
    conn: &mut PgConnection,
    name: &RoleName,
    description: Option<&str>,
) -> Result<Role, RepositoryError> {
    lock_name_scope(&mut *conn, NAME_SCOPE).await?;

    let existing = sqlx::query_as::<_, RoleRow>(
        r"
        SELECT id, name, description
        FROM gazetteer.role
        WHERE name = $1
        ORDER BY id
        LIMIT 1
        ",
    )
    .bind(name.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = existing {
        return Ok(row.into());
    }

    let row = sqlx::query_as::<_, RoleRow>(
        r"
        INSERT INTO gazetteer.role (name, description)
        VALUES ($1, $2)
        RETURNING id, name, description
        ",
    )
    .bind(name.as_str())
    .bind(description)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}
