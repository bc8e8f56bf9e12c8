//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password login and user creation
//! - `bootstrap` - First administrator from a secrets file
//! - `directory` - Address hierarchy writes and the full-name cascade

pub mod auth;
pub mod bootstrap;
pub mod directory;

pub use auth::{AuthError, AuthService};
pub use bootstrap::{AdminSecrets, BootstrapError, SeedOutcome, seed_admin};
pub use directory::{DirectoryError, DirectoryService, Registered};
