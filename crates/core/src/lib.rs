//! Gazetteer Core - Shared types and hierarchy logic.
//!
//! The pieces of the address directory that need no I/O, shared by:
//! - `gazetteer-admin` - Administrative service (Postgres repositories, JSON API)
//! - `gazetteer-cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database access,
//! no HTTP. The admin crate loads snapshots from Postgres, hands them to the
//! planner here, and writes back what the planner returns inside a single
//! transaction.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids and validated value types
//! - [`hierarchy`] - Acyclicity checks for parent assignment
//! - [`fullname`] - Full-name cascade planner
//! - [`label`] - Human-readable labels for directory entities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fullname;
pub mod hierarchy;
pub mod label;
pub mod types;

pub use fullname::{CascadeError, PlannedFullName, Registration, SubtreeNode, plan_registration};
pub use hierarchy::{HierarchyError, check_parent_assignment};
pub use label::address_label;
pub use types::*;
