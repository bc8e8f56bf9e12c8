//! Materialized full-name repository.
//!
//! Rows are only ever appended. For display, the row with the highest id per
//! address wins.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use gazetteer_core::{AddressId, FullNameId, PlannedFullName};

use super::RepositoryError;
use crate::models::FullNameEntry;

#[derive(Debug, sqlx::FromRow)]
struct FullNameRow {
    id: i32,
    address_id: i32,
    full_name: String,
    created_at: DateTime<Utc>,
}

impl From<FullNameRow> for FullNameEntry {
    fn from(row: FullNameRow) -> Self {
        Self {
            id: FullNameId::new(row.id),
            address_id: AddressId::new(row.address_id),
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

/// Read access to materialized full names.
pub struct FullNameRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FullNameRepository<'a> {
    /// Create a new full-name repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every full name, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<FullNameEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, FullNameRow>(
            r"
            SELECT id, address_id, full_name, created_at
            FROM gazetteer.full_name_to_address
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Full names of one address, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_address(
        &self,
        address: AddressId,
    ) -> Result<Vec<FullNameEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, FullNameRow>(
            r"
            SELECT id, address_id, full_name, created_at
            FROM gazetteer.full_name_to_address
            WHERE address_id = $1
            ORDER BY id
            ",
        )
        .bind(address.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The authoritative (highest id) full name of an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(
        &self,
        address: AddressId,
    ) -> Result<Option<FullNameEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, FullNameRow>(
            r"
            SELECT id, address_id, full_name, created_at
            FROM gazetteer.full_name_to_address
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

/// Full-name strings of one address inside a transaction, oldest first.
pub(crate) async fn strings_for(
    conn: &mut PgConnection,
    address: AddressId,
) -> Result<Vec<String>, RepositoryError> {
    let names = sqlx::query_scalar::<_, String>(
        r"
        SELECT full_name
        FROM gazetteer.full_name_to_address
        WHERE address_id = $1
        ORDER BY id
        ",
    )
    .bind(address.as_i32())
    .fetch_all(&mut *conn)
    .await?;

    Ok(names)
}

/// Insert planned rows in one statement, preserving their order in the ids.
pub(crate) async fn insert_planned(
    conn: &mut PgConnection,
    planned: &[PlannedFullName],
) -> Result<Vec<FullNameEntry>, RepositoryError> {
    if planned.is_empty() {
        return Ok(Vec::new());
    }

    let full_names: Vec<String> = planned.iter().map(|p| p.full_name.clone()).collect();
    let addresses: Vec<i32> = planned.iter().map(|p| p.address.as_i32()).collect();

    let rows = sqlx::query_as::<_, FullNameRow>(
        r"
        INSERT INTO gazetteer.full_name_to_address (full_name, address_id)
        SELECT t.full_name, t.address_id
        FROM UNNEST($1::text[], $2::int4[]) WITH ORDINALITY AS t(full_name, address_id, ord)
        ORDER BY t.ord
        RETURNING id, address_id, full_name, created_at
        ",
    )
    .bind(full_names)
    .bind(addresses)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "full name conflict", "address does not exist"))?;

    let mut entries: Vec<FullNameEntry> = rows.into_iter().map(Into::into).collect();
    entries.sort_by_key(|entry| entry.id);
    Ok(entries)
}
