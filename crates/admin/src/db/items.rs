//! Catalog item repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use gazetteer_core::{AddressId, ItemId, ItemName};

use super::{RepositoryError, lock_name_scope};
use crate::models::Item;

const NAME_SCOPE: &str = "gazetteer.item.name";
const MISSING_ADDRESS: &str = "address does not exist";

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i32,
    name: String,
    address_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: ItemId::new(row.id),
            name: row.name,
            address_id: AddressId::new(row.address_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for catalog items.
pub struct ItemRepository<'a> {
    pool: &'a PgPool,
    unique_names: bool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    ///
    /// With `unique_names` set, creating or renaming an item to a name that
    /// another item already carries is rejected.
    #[must_use]
    pub const fn new(pool: &'a PgPool, unique_names: bool) -> Self {
        Self { pool, unique_names }
    }

    /// Create an item at `address`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken or the address
    /// does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &ItemName,
        address: AddressId,
    ) -> Result<Item, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if self.unique_names {
            lock_name_scope(&mut tx, NAME_SCOPE).await?;
            if name_taken(&mut tx, name, None).await? {
                return Err(RepositoryError::Conflict(format!(
                    "item name '{name}' is already taken"
                )));
            }
        }

        let row = sqlx::query_as::<_, ItemRow>(
            r"
            INSERT INTO gazetteer.item (name, address_id)
            VALUES ($1, $2)
            RETURNING id, name, address_id, created_at, updated_at
            ",
        )
        .bind(name.as_str())
        .bind(address.as_i32())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "item conflict", MISSING_ADDRESS))?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT id, name, address_id, created_at, updated_at
            FROM gazetteer.item
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List all items in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r"
            SELECT id, name, address_id, created_at, updated_at
            FROM gazetteer.item
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Rename an item and/or move it to another address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken or the
    /// address does not exist.
    pub async fn update(
        &self,
        id: ItemId,
        name: &ItemName,
        address: AddressId,
    ) -> Result<Item, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if self.unique_names {
            lock_name_scope(&mut tx, NAME_SCOPE).await?;
            if name_taken(&mut tx, name, Some(id)).await? {
                return Err(RepositoryError::Conflict(format!(
                    "item name '{name}' is already taken"
                )));
            }
        }

        let row = sqlx::query_as::<_, ItemRow>(
            r"
            UPDATE gazetteer.item
            SET name = $2, address_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, address_id, created_at, updated_at
            ",
        )
        .bind(id.as_i32())
        .bind(name.as_str())
        .bind(address.as_i32())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "item conflict", MISSING_ADDRESS))?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    pub async fn delete(&self, id: ItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM gazetteer.item WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

async fn name_taken(
    conn: &mut sqlx::PgConnection,
    name: &ItemName,
    except: Option<ItemId>,
) -> Result<bool, RepositoryError> {
    let taken = sqlx::query_scalar::<_, bool>(
        r"
        SELECT EXISTS (
            SELECT 1 FROM gazetteer.item
            WHERE name = $1 AND ($2::int4 IS NULL OR id <> $2)
        )
        ",
    )
    .bind(name.as_str())
    .bind(except.map(|id| id.as_i32()))
    .fetch_one(&mut *conn)
    .await?;

    Ok(taken)
}
