//! Name registry repository.
//!
//! Names are append-only. New names are only inserted through
//! [`crate::services::DirectoryService::register_name`], which runs the
//! full-name cascade in the same transaction; this module exposes reads plus
//! the transaction-scoped insert.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use gazetteer_core::{AddressId, NameId, PlaceName};

use super::RepositoryError;
use crate::models::NameEntry;

#[derive(Debug, sqlx::FromRow)]
struct NameRow {
    id: i32,
    address_id: i32,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<NameRow> for NameEntry {
    fn from(row: NameRow) -> Self {
        Self {
            id: NameId::new(row.id),
            address_id: AddressId::new(row.address_id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

/// Read access to the name registry.
pub struct NameRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NameRepository<'a> {
    /// Create a new name repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every name ever registered, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<NameEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, NameRow>(
            r"
            SELECT id, address_id, name, created_at
            FROM gazetteer.name_to_address
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Names registered on one address, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_address(&self, address: AddressId) -> Result<Vec<NameEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, NameRow>(
            r"
            SELECT id, address_id, name, created_at
            FROM gazetteer.name_to_address
            WHERE address_id = $1
            ORDER BY id
            ",
        )
        .bind(address.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The most recently registered name of an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, address: AddressId) -> Result<Option<NameEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, NameRow>(
            r"
            SELECT id, address_id, name, created_at
            FROM gazetteer.name_to_address
            WHERE address_id = $1
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(address.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

/// Append a name inside the caller's transaction.
pub(crate) async fn insert(
    conn: &mut PgConnection,
    address: AddressId,
    name: &PlaceName,
) -> Result<NameEntry, RepositoryError> {
    let row = sqlx::query_as::<_, NameRow>(
        r"
        INSERT INTO gazetteer.name_to_address (name, address_id)
        VALUES ($1, $2)
        RETURNING id, address_id, name, created_at
        ",
    )
    .bind(name.as_str())
    .bind(address.as_i32())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "name conflict", "address does not exist"))?;

    Ok(row.into())
}

/// Names of several addresses as `(address, name)`, oldest first.
pub(crate) async fn names_of(
    conn: &mut PgConnection,
    addresses: &[AddressId],
) -> Result<Vec<(AddressId, String)>, RepositoryError> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<i32> = addresses.iter().map(AddressId::as_i32).collect();
    let rows = sqlx::query_as::<_, (i32, String)>(
        r"
        SELECT address_id, name
        FROM gazetteer.name_to_address
        WHERE address_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(raw)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(address, name)| (AddressId::new(address), name))
        .collect())
}
