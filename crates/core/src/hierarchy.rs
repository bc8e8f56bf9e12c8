//! Acyclicity rules for the address forest.
//!
//! Addresses form a forest: following `parent` links from any node must reach
//! a root. New nodes cannot break this (they have no children yet), so the
//! only assignment that needs checking is moving an existing node under a new
//! parent.

use crate::types::AddressId;

/// Errors raised when a parent assignment would break the forest.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyError {
    /// The node was asked to become its own parent.
    #[error("address {node} cannot be its own parent")]
    SelfParent {
        /// The node being moved.
        node: AddressId,
    },
    /// The proposed parent is a descendant of the node.
    #[error("moving address {node} under {parent} would create a cycle")]
    Cycle {
        /// The node being moved.
        node: AddressId,
        /// The proposed parent.
        parent: AddressId,
    },
}

/// Check that `node` may be placed under `parent`.
///
/// `parent_chain` is the ancestor sequence of the proposed parent, starting
/// with the parent itself and ending at its root. Passing `None` as the parent
/// (making `node` a root) is always allowed.
///
/// # Errors
///
/// Returns [`HierarchyError::SelfParent`] or [`HierarchyError::Cycle`] if the
/// assignment would make `node` reachable from itself.
pub fn check_parent_assignment(
    node: AddressId,
    parent: Option<AddressId>,
    parent_chain: &[AddressId],
) -> Result<(), HierarchyError> {
    let Some(parent) = parent else {
        return Ok(());
    };

    if parent == node {
        return Err(HierarchyError::SelfParent { node });
    }

    if parent_chain.contains(&node) {
        return Err(HierarchyError::Cycle { node, parent });
    }

    Ok(())
}
