//! Directory service.
//!
//! Owns every write that touches the address hierarchy. Name registration in
//! particular must be atomic with its full-name cascade, so it runs as one
//! transaction here instead of going through the pool-level repositories.
//!
//! # Locking
//!
//! `register_name` share-locks the target's ancestors (their names and parent
//! links feed the new full names) and then locks the target itself against
//! other writers. Descendants are read in the same transaction; concurrent
//! registrations on one node are therefore serialized.

use std::collections::BTreeMap;

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use gazetteer_core::{
    AddressId, AddressKind, CascadeError, HierarchyError, PlaceName, Registration, SubtreeNode,
    check_parent_assignment, plan_registration,
};

use crate::config::DirectoryConfig;
use crate::db::{AddressRepository, RepositoryError, addresses, full_names, names};
use crate::models::{Address, FullNameEntry, NameEntry};

/// Errors raised by directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The address (or requested parent) doesn't exist.
    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    /// The address is still referenced and cannot be deleted.
    #[error("address {0} is still referenced by children, items or names")]
    AddressInUse(AddressId),

    /// Reparenting would break the forest.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// The full-name cascade could not be planned.
    #[error(transparent)]
    Cascade(#[from] CascadeError),

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Result of a committed name registration.
#[derive(Debug, Clone)]
pub struct Registered {
    /// The appended name.
    pub name: NameEntry,
    /// Full names written by the cascade, in insertion order.
    pub full_names: Vec<FullNameEntry>,
}

/// Hierarchy writes and name registration.
pub struct DirectoryService<'a> {
    pool: &'a PgPool,
    config: DirectoryConfig,
}

impl<'a> DirectoryService<'a> {
    /// Create a new directory service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, config: DirectoryConfig) -> Self {
        Self { pool, config }
    }

    /// Create an address, optionally below `parent`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AddressNotFound` if `parent` doesn't exist.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn create_address(
        &self,
        kind: &AddressKind,
        parent: Option<AddressId>,
    ) -> Result<Address, DirectoryError> {
        let address = AddressRepository::new(self.pool)
            .create(kind, parent)
            .await
            .map_err(|e| match (e, parent) {
                (RepositoryError::Conflict(_), Some(parent)) => {
                    DirectoryError::AddressNotFound(parent)
                }
                (e, _) => e.into(),
            })?;

        tracing::info!(address_id = %address.id, "Address created");
        Ok(address)
    }

    /// Move an address under a new parent, or make it a root.
    ///
    /// Existing full names are left as they are.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AddressNotFound` if the node or the new parent
    /// doesn't exist, and `DirectoryError::Hierarchy` if the move would create
    /// a cycle.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn set_parent(
        &self,
        id: AddressId,
        parent: Option<AddressId>,
    ) -> Result<Address, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        addresses::lock_for_write(&mut tx, id)
            .await?
            .ok_or(DirectoryError::AddressNotFound(id))?;

        let chain = match parent {
            Some(parent) => {
                let chain = addresses::chain_ids(&mut tx, parent).await?;
                if chain.is_empty() {
                    return Err(DirectoryError::AddressNotFound(parent));
                }
                addresses::lock_shared(&mut tx, &chain).await?;
                // The chain may have moved while we waited for the locks.
                addresses::chain_ids(&mut tx, parent).await?
            }
            None => Vec::new(),
        };

        check_parent_assignment(id, parent, &chain)?;

        let address = addresses::update_parent(&mut tx, id, parent).await?;
        tx.commit().await?;

        tracing::info!(parent_id = ?parent, "Address moved");
        Ok(address)
    }

    /// Delete an address nothing refers to.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AddressNotFound` if it doesn't exist and
    /// `DirectoryError::AddressInUse` if children, items or names still point
    /// at it.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: AddressId) -> Result<(), DirectoryError> {
        AddressRepository::new(self.pool)
            .delete(id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => DirectoryError::AddressNotFound(id),
                RepositoryError::Conflict(_) => DirectoryError::AddressInUse(id),
                e => e.into(),
            })?;

        tracing::info!("Address deleted");
        Ok(())
    }

    /// Register a name for an address and materialize the resulting full
    /// names for it and its whole subtree.
    ///
    /// Either the name and every cascaded full name are committed, or
    /// nothing is.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AddressNotFound` if the address doesn't exist,
    /// `DirectoryError::Cascade` if the subtree is cyclic or the cascade
    /// exceeds the configured limit.
    #[instrument(skip(self), fields(address_id = %address, name = %name))]
    pub async fn register_name(
        &self,
        address: AddressId,
        name: &PlaceName,
    ) -> Result<Registered, DirectoryError> {
        let mut tx = self.pool.begin().await?;

        let chain = addresses::chain_ids(&mut tx, address).await?;
        let ancestors = chain.get(1..).unwrap_or_default();
        addresses::lock_shared(&mut tx, ancestors).await?;

        let target = addresses::lock_for_write(&mut tx, address)
            .await?
            .ok_or(DirectoryError::AddressNotFound(address))?;

        let entry = names::insert(&mut tx, address, name).await?;

        let parent_full_names = match target.parent_id {
            Some(parent) => full_names::strings_for(&mut tx, parent).await?,
            None => Vec::new(),
        };

        let rows = addresses::descendants(&mut tx, address).await?;
        if let Some(row) = rows.iter().find(|row| row.is_cycle) {
            return Err(CascadeError::Cycle {
                address: AddressId::new(row.id),
            }
            .into());
        }

        let mut subtree: BTreeMap<AddressId, SubtreeNode> = rows
            .into_iter()
            .map(|row| {
                let id = AddressId::new(row.id);
                let node = SubtreeNode {
                    id,
                    parent: row.parent_id.map(AddressId::new),
                    kind: row.kind,
                    names: Vec::new(),
                };
                (id, node)
            })
            .collect();

        let ids: Vec<AddressId> = subtree.keys().copied().collect();
        for (owner, historical) in names::names_of(&mut tx, &ids).await? {
            if let Some(node) = subtree.get_mut(&owner) {
                node.names.push(historical);
            }
        }
        let subtree: Vec<SubtreeNode> = subtree.into_values().collect();

        let registration = Registration {
            address,
            kind: &target.kind,
            name: name.as_str(),
            parent_full_names: &parent_full_names,
        };
        let planned =
            plan_registration(&registration, &subtree, self.config.max_cascade_entries)?;

        let full_names = full_names::insert_planned(&mut tx, &planned).await?;
        tx.commit().await?;

        tracing::info!(
            name_id = %entry.id,
            descendants = subtree.len(),
            entries_created = full_names.len(),
            "Name registered"
        );

        Ok(Registered {
            name: entry,
            full_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DirectoryError::AddressInUse(AddressId::new(3));
        assert_eq!(
            err.to_string(),
            "address 3 is still referenced by children, items or names"
        );

        let err: DirectoryError = CascadeError::TooLarge { limit: 5 }.into();
        assert_eq!(
            err.to_string(),
            "cascade exceeds the limit of 5 full-name entries"
        );
    }

    #[test]
    fn test_database_errors_are_not_double_prefixed() {
        let err: DirectoryError = sqlx::Error::PoolTimedOut.into();
        let message = err.to_string();
        assert!(message.starts_with("database error: "));
        assert_eq!(message.matches("database error").count(), 1);
    }
}
