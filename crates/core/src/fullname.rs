//! Full-name cascade planner.
//!
//! Registering a name on an address produces new denormalized full names for
//! that address and, transitively, for every descendant. Nothing is ever
//! overwritten: each registration appends rows, and readers pick the entry
//! with the highest id.
//!
//! The planner is pure. The caller supplies a snapshot of everything the
//! cascade reads (the parent's full names and the target's subtree with each
//! node's historical names) and gets back the rows to insert, in insertion
//! order. Writing them is the caller's job, inside the same transaction that
//! took the snapshot.
//!
//! # Ordering
//!
//! Rows come out in depth-first pre-order: each new full name is immediately
//! followed by everything derived from it. Children are visited in id order
//! and each child's names in registration order, so for every address the last
//! row written is built from the latest ancestor full name and the latest
//! name.

use std::collections::{BTreeMap, HashSet};

use crate::types::AddressId;

/// Errors that abort a cascade before anything is written.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeError {
    /// The subtree under the target loops back on itself.
    #[error("address hierarchy contains a cycle through address {address}")]
    Cycle {
        /// A node reached twice during traversal.
        address: AddressId,
    },
    /// The cascade would write more rows than allowed.
    #[error("cascade exceeds the limit of {limit} full-name entries")]
    TooLarge {
        /// Configured maximum.
        limit: usize,
    },
}

/// A descendant of the registration target, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeNode {
    /// Node id.
    pub id: AddressId,
    /// Parent id; `None` only for roots.
    pub parent: Option<AddressId>,
    /// Type tag, e.g. `city`.
    pub kind: String,
    /// Every name registered on this node, oldest first.
    pub names: Vec<String>,
}

/// The name registration that triggers a cascade.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    /// Address receiving the name.
    pub address: AddressId,
    /// Type tag of that address.
    pub kind: &'a str,
    /// The newly registered name.
    pub name: &'a str,
    /// Full names of the address's parent, oldest first. Empty for roots and
    /// for parents that have never been named.
    pub parent_full_names: &'a [String],
}

/// A full-name row the caller should insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFullName {
    /// Address the row belongs to.
    pub address: AddressId,
    /// The materialized full name.
    pub full_name: String,
}

/// Build `"{prefix} {kind} {name}"`, or `"{kind} {name}"` without a prefix.
#[must_use]
pub fn compose(prefix: Option<&str>, kind: &str, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix} {kind} {name}"),
        None => format!("{kind} {name}"),
    }
}

/// Plan every full-name row produced by `registration`.
///
/// `subtree` holds the target's descendants (extra unrelated nodes are
/// ignored). `limit` caps the number of rows; a cascade that would exceed it
/// fails as a whole.
///
/// # Errors
///
/// Returns [`CascadeError::Cycle`] if the subtree is not a tree, and
/// [`CascadeError::TooLarge`] if more than `limit` rows would be produced.
pub fn plan_registration(
    registration: &Registration<'_>,
    subtree: &[SubtreeNode],
    limit: usize,
) -> Result<Vec<PlannedFullName>, CascadeError> {
    let children = children_by_parent(subtree);
    ensure_acyclic(registration.address, &children)?;

    let own: Vec<PlannedFullName> = if registration.parent_full_names.is_empty() {
        vec![PlannedFullName {
            address: registration.address,
            full_name: compose(None, registration.kind, registration.name),
        }]
    } else {
        registration
            .parent_full_names
            .iter()
            .map(|parent| PlannedFullName {
                address: registration.address,
                full_name: compose(Some(parent), registration.kind, registration.name),
            })
            .collect()
    };

    // Stack of rows not yet emitted; popping yields pre-order.
    let mut stack: Vec<PlannedFullName> = own.into_iter().rev().collect();
    let mut planned = Vec::new();

    while let Some(entry) = stack.pop() {
        if planned.len() >= limit {
            return Err(CascadeError::TooLarge { limit });
        }

        let prefix = entry.full_name.as_str();
        let derived: Vec<PlannedFullName> = children
            .get(&entry.address)
            .into_iter()
            .flatten()
            .flat_map(move |child| {
                child.names.iter().map(move |name| PlannedFullName {
                    address: child.id,
                    full_name: compose(Some(prefix), &child.kind, name),
                })
            })
            .collect();

        planned.push(entry);
        stack.extend(derived.into_iter().rev());
    }

    Ok(planned)
}

/// Group nodes under their parent, children in id order.
fn children_by_parent(subtree: &[SubtreeNode]) -> BTreeMap<AddressId, Vec<&SubtreeNode>> {
    let mut children: BTreeMap<AddressId, Vec<&SubtreeNode>> = BTreeMap::new();
    for node in subtree {
        if let Some(parent) = node.parent {
            children.entry(parent).or_default().push(node);
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|node| node.id);
    }
    children
}

/// Walk the subtree once; any node reached twice means it is not a tree.
fn ensure_acyclic(
    root: AddressId,
    children: &BTreeMap<AddressId, Vec<&SubtreeNode>>,
) -> Result<(), CascadeError> {
    let mut visited = HashSet::from([root]);
    let mut worklist = vec![root];

    while let Some(current) = worklist.pop() {
        for child in children.get(&current).into_iter().flatten() {
            if !visited.insert(child.id) {
                return Err(CascadeError::Cycle { address: child.id });
            }
            worklist.push(child.id);
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NO_LIMIT: usize = usize::MAX;

    fn node(id: i32, parent: Option<i32>, kind: &str, names: &[&str]) -> SubtreeNode {
        SubtreeNode {
            id: AddressId::new(id),
            parent: parent.map(AddressId::new),
            kind: kind.to_owned(),
            names: names.iter().map(|n| (*n).to_owned()).collect(),
        }
    }

    fn full_names(planned: &[PlannedFullName]) -> Vec<(i32, &str)> {
        planned
            .iter()
            .map(|p| (p.address.as_i32(), p.full_name.as_str()))
            .collect()
    }

    #[test]
    fn test_root_gets_single_entry() {
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Germany",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &[], NO_LIMIT).unwrap();
        assert_eq!(full_names(&planned), vec![(1, "country Germany")]);
    }

    #[test]
    fn test_unnamed_parent_behaves_like_root() {
        // Parent exists but has no full names yet.
        let registration = Registration {
            address: AddressId::new(2),
            kind: "city",
            name: "Berlin",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &[], NO_LIMIT).unwrap();
        assert_eq!(full_names(&planned), vec![(2, "city Berlin")]);
    }

    #[test]
    fn test_one_entry_per_parent_full_name() {
        let parents = vec![
            "country Germany".to_owned(),
            "country Deutschland".to_owned(),
            "country Allemagne".to_owned(),
        ];
        let registration = Registration {
            address: AddressId::new(2),
            kind: "city",
            name: "Berlin",
            parent_full_names: &parents,
        };

        let planned = plan_registration(&registration, &[], NO_LIMIT).unwrap();
        assert_eq!(
            full_names(&planned),
            vec![
                (2, "country Germany city Berlin"),
                (2, "country Deutschland city Berlin"),
                (2, "country Allemagne city Berlin"),
            ]
        );
    }

    #[test]
    fn test_rename_root_cascades_to_child() {
        let subtree = [node(2, Some(1), "city", &["Berlin"])];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Deutschland",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &subtree, NO_LIMIT).unwrap();
        assert_eq!(
            full_names(&planned),
            vec![
                (1, "country Deutschland"),
                (2, "country Deutschland city Berlin"),
            ]
        );
    }

    #[test]
    fn test_cascade_covers_every_name_and_descendant_depth_first() {
        // 1 country
        // ├── 2 state (Bavaria, Bayern)
        // │   └── 4 city (Munich)
        // └── 3 state (Saxony)
        let subtree = [
            node(3, Some(1), "state", &["Saxony"]),
            node(2, Some(1), "state", &["Bavaria", "Bayern"]),
            node(4, Some(2), "city", &["Munich"]),
        ];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Germany",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &subtree, NO_LIMIT).unwrap();
        assert_eq!(
            full_names(&planned),
            vec![
                (1, "country Germany"),
                (2, "country Germany state Bavaria"),
                (4, "country Germany state Bavaria city Munich"),
                (2, "country Germany state Bayern"),
                (4, "country Germany state Bayern city Munich"),
                (3, "country Germany state Saxony"),
            ]
        );
    }

    #[test]
    fn test_descendant_count_multiplies_with_ancestor_entries() {
        let parents = vec!["planet Earth".to_owned(), "planet Terra".to_owned()];
        let subtree = [
            node(11, Some(10), "state", &["A", "B"]),
            node(12, Some(11), "city", &["X", "Y", "Z"]),
        ];
        let registration = Registration {
            address: AddressId::new(10),
            kind: "country",
            name: "C",
            parent_full_names: &parents,
        };

        let planned = plan_registration(&registration, &subtree, NO_LIMIT).unwrap();
        let count = |id: i32| planned.iter().filter(|p| p.address.as_i32() == id).count();
        assert_eq!(count(10), 2);
        assert_eq!(count(11), 2 * 2);
        assert_eq!(count(12), 2 * 2 * 3);
    }

    #[test]
    fn test_latest_entry_per_address_uses_latest_names() {
        let subtree = [
            node(2, Some(1), "state", &["Old State", "New State"]),
            node(3, Some(2), "city", &["Old City", "New City"]),
        ];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Land",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &subtree, NO_LIMIT).unwrap();
        let last_for = |id: i32| {
            planned
                .iter()
                .rev()
                .find(|p| p.address.as_i32() == id)
                .map(|p| p.full_name.as_str())
        };
        assert_eq!(last_for(2), Some("country Land state New State"));
        assert_eq!(
            last_for(3),
            Some("country Land state New State city New City")
        );
    }

    #[test]
    fn test_unnamed_child_stops_cascade() {
        let subtree = [
            node(2, Some(1), "state", &[]),
            node(3, Some(2), "city", &["Hidden"]),
        ];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Land",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &subtree, NO_LIMIT).unwrap();
        assert_eq!(full_names(&planned), vec![(1, "country Land")]);
    }

    #[test]
    fn test_unrelated_nodes_are_ignored() {
        let subtree = [node(9, Some(8), "city", &["Elsewhere"])];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Land",
            parent_full_names: &[],
        };

        let planned = plan_registration(&registration, &subtree, NO_LIMIT).unwrap();
        assert_eq!(planned.len(), 1);
    }

    #[test]
    fn test_cycle_back_to_target_is_rejected() {
        // 1 -> 2 -> 3 -> 1
        let subtree = [
            node(2, Some(1), "a", &["x"]),
            node(3, Some(2), "b", &["y"]),
            node(1, Some(3), "c", &["z"]),
        ];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "c",
            name: "z",
            parent_full_names: &[],
        };

        assert_eq!(
            plan_registration(&registration, &subtree, NO_LIMIT),
            Err(CascadeError::Cycle {
                address: AddressId::new(1)
            })
        );
    }

    #[test]
    fn test_limit_aborts_whole_cascade() {
        let subtree = [node(2, Some(1), "city", &["A", "B", "C"])];
        let registration = Registration {
            address: AddressId::new(1),
            kind: "country",
            name: "Land",
            parent_full_names: &[],
        };

        assert_eq!(
            plan_registration(&registration, &subtree, 3),
            Err(CascadeError::TooLarge { limit: 3 })
        );
        assert_eq!(plan_registration(&registration, &subtree, 4).unwrap().len(), 4);
    }

    #[test]
    fn test_compose() {
        assert_eq!(compose(None, "city", "Rome"), "city Rome");
        assert_eq!(
            compose(Some("country Italy"), "city", "Rome"),
            "country Italy city Rome"
        );
    }
}
