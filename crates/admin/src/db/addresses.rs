//! Address hierarchy repository.
//!
//! Pool-level reads and writes live on [`AddressRepository`]; the
//! transaction-scoped helpers at the bottom of this module are used by
//! [`crate::services::DirectoryService`] so that locking, reading the subtree
//! and writing full names all happen on one connection.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use gazetteer_core::{AddressId, AddressKind};

use super::RepositoryError;
use crate::models::{Address, AddressSummary};

/// Selects the newest full name of `a` as `latest_full_name`.
const LATEST_FULL_NAME_JOIN: &str = r"
    LEFT JOIN LATERAL (
        SELECT f.full_name
        FROM gazetteer.full_name_to_address f
        WHERE f.address_id = a.id
        ORDER BY f.id DESC
        LIMIT 1
    ) latest ON TRUE";

/// Recursive walk from `$1` to its root, guarded against loops.
const ANCESTOR_CHAIN_CTE: &str = r"
    WITH RECURSIVE chain AS (
        SELECT a.id, a.parent_id, 0 AS depth, ARRAY[a.id] AS path
        FROM gazetteer.address a
        WHERE a.id = $1

        UNION ALL

        SELECT p.id, p.parent_id, c.depth + 1, c.path || p.id
        FROM gazetteer.address p
        JOIN chain c ON p.id = c.parent_id
        WHERE NOT p.id = ANY(c.path)
    )";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    kind: String,
    parent_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            kind: row.kind,
            parent_id: row.parent_id.map(AddressId::new),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressSummaryRow {
    id: i32,
    kind: String,
    parent_id: Option<i32>,
    created_at: DateTime<Utc>,
    latest_full_name: Option<String>,
}

impl From<AddressSummaryRow> for AddressSummary {
    fn from(row: AddressSummaryRow) -> Self {
        Self {
            address: Address {
                id: AddressId::new(row.id),
                kind: row.kind,
                parent_id: row.parent_id.map(AddressId::new),
                created_at: row.created_at,
            },
            latest_full_name: row.latest_full_name,
        }
    }
}

/// A node of the subtree below a registration target.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubtreeRow {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub kind: String,
    /// Set when the walk reached a node already on its own path.
    pub is_cycle: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the address hierarchy.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a node, optionally below `parent`.
    ///
    /// A fresh node has no children, so it can never close a cycle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `parent` does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        kind: &AddressKind,
        parent: Option<AddressId>,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            INSERT INTO gazetteer.address (kind, parent_id)
            VALUES ($1, $2)
            RETURNING id, kind, parent_id, created_at
            ",
        )
        .bind(kind.as_str())
        .bind(parent.map(|p| p.as_i32()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::from_write(e, "address already exists", "parent address does not exist")
        })?;

        Ok(row.into())
    }

    /// Get a node by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            r"
            SELECT id, kind, parent_id, created_at
            FROM gazetteer.address
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a node with its current full name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, id: AddressId) -> Result<Option<AddressSummary>, RepositoryError> {
        let sql = format!(
            r"
            SELECT a.id, a.kind, a.parent_id, a.created_at,
                   latest.full_name AS latest_full_name
            FROM gazetteer.address a
            {LATEST_FULL_NAME_JOIN}
            WHERE a.id = $1
            "
        );

        let row = sqlx::query_as::<_, AddressSummaryRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// List every node with its current full name, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AddressSummary>, RepositoryError> {
        let sql = format!(
            r"
            SELECT a.id, a.kind, a.parent_id, a.created_at,
                   latest.full_name AS latest_full_name
            FROM gazetteer.address a
            {LATEST_FULL_NAME_JOIN}
            ORDER BY a.id
            "
        );

        let rows = sqlx::query_as::<_, AddressSummaryRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Direct children of a node, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn children(&self, id: AddressId) -> Result<Vec<AddressSummary>, RepositoryError> {
        let sql = format!(
            r"
            SELECT a.id, a.kind, a.parent_id, a.created_at,
                   latest.full_name AS latest_full_name
            FROM gazetteer.address a
            {LATEST_FULL_NAME_JOIN}
            WHERE a.parent_id = $1
            ORDER BY a.id
            "
        );

        let rows = sqlx::query_as::<_, AddressSummaryRow>(&sql)
            .bind(id.as_i32())
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The node itself followed by each ancestor up to its root.
    ///
    /// Empty if the node does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ancestors(&self, id: AddressId) -> Result<Vec<AddressSummary>, RepositoryError> {
        let sql = format!(
            r"
            {ANCESTOR_CHAIN_CTE}
            SELECT a.id, a.kind, a.parent_id, a.created_at,
                   latest.full_name AS latest_full_name
            FROM chain
            JOIN gazetteer.address a ON a.id = chain.id
            {LATEST_FULL_NAME_JOIN}
            ORDER BY chain.depth
            "
        );

        let rows = sqlx::query_as::<_, AddressSummaryRow>(&sql)
            .bind(id.as_i32())
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Delete a node.
    ///
    /// Nodes referenced by children, items, names or full names are protected
    /// by `ON DELETE RESTRICT`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the node doesn't exist.
    /// Returns `RepositoryError::Conflict` if anything still references it.
    pub async fn delete(&self, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM gazetteer.address WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_write(
                    e,
                    "address conflict",
                    "address is still referenced by children, items or names",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

/// Lock a node against concurrent writers and return it.
pub(crate) async fn lock_for_write(
    conn: &mut PgConnection,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(
        r"
        SELECT id, kind, parent_id, created_at
        FROM gazetteer.address
        WHERE id = $1
        FOR NO KEY UPDATE
        ",
    )
    .bind(id.as_i32())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Ids from `id` up to its root (inclusive), without locking.
pub(crate) async fn chain_ids(
    conn: &mut PgConnection,
    id: AddressId,
) -> Result<Vec<AddressId>, RepositoryError> {
    let sql = format!("{ANCESTOR_CHAIN_CTE} SELECT id FROM chain ORDER BY depth");

    let ids = sqlx::query_scalar::<_, i32>(&sql)
        .bind(id.as_i32())
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids.into_iter().map(AddressId::new).collect())
}

/// Share-lock a set of nodes so they cannot be moved or renamed meanwhile.
pub(crate) async fn lock_shared(
    conn: &mut PgConnection,
    ids: &[AddressId],
) -> Result<(), RepositoryError> {
    if ids.is_empty() {
        return Ok(());
    }

    let raw: Vec<i32> = ids.iter().map(AddressId::as_i32).collect();
    sqlx::query(
        r"
        SELECT id FROM gazetteer.address
        WHERE id = ANY($1)
        ORDER BY id
        FOR SHARE
        ",
    )
    .bind(raw)
    .fetch_all(&mut *conn)
    .await?;

    Ok(())
}

/// Every descendant of `id` (excluding `id` itself).
pub(crate) async fn descendants(
    conn: &mut PgConnection,
    id: AddressId,
) -> Result<Vec<SubtreeRow>, RepositoryError> {
    let rows = sqlx::query_as::<_, SubtreeRow>(
        r"
        WITH RECURSIVE subtree AS (
            SELECT c.id, c.parent_id, c.kind, ARRAY[$1::int4, c.id] AS path,
                   c.id = $1 AS is_cycle
            FROM gazetteer.address c
            WHERE c.parent_id = $1

            UNION ALL

            SELECT c.id, c.parent_id, c.kind, s.path || c.id,
                   c.id = ANY(s.path) AS is_cycle
            FROM gazetteer.address c
            JOIN subtree s ON c.parent_id = s.id
            WHERE NOT s.is_cycle
        )
        SELECT id, parent_id, kind, is_cycle FROM subtree
        ",
    )
    .bind(id.as_i32())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Point `id` at a new parent (or make it a root).
pub(crate) async fn update_parent(
    conn: &mut PgConnection,
    id: AddressId,
    parent: Option<AddressId>,
) -> Result<Address, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(
        r"
        UPDATE gazetteer.address
        SET parent_id = $2
        WHERE id = $1
        RETURNING id, kind, parent_id, created_at
        ",
    )
    .bind(id.as_i32())
    .bind(parent.map(|p| p.as_i32()))
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        RepositoryError::from_write(e, "address conflict", "parent address does not exist")
    })?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}
