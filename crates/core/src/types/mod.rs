//! Core types for the gazetteer directory.
//!
//! This module provides type-safe wrappers for directory and identity concepts.

pub mod email;
pub mod id;
pub mod value;

pub use email::{Email, EmailError};
pub use id::*;
pub use value::{AddressKind, ItemName, PlaceName, RoleName, ValueError};
