//! Domain models for the directory and identity tables.
//!
//! These are validated domain objects, separate from the internal row types in
//! [`crate::db`].

pub mod directory;
pub mod session;
pub mod user;

pub use directory::{Address, AddressSummary, FullNameEntry, Item, NameEntry};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Role, User};
