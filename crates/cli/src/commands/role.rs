//! Role management commands.

use gazetteer_admin::db::RoleRepository;
use gazetteer_core::RoleName;

use super::{CommandError, connect};

/// Create a role.
///
/// # Errors
///
/// Returns an error if the name is invalid or, with unique role names
/// enabled, already taken.
pub async fn create(name: &str, description: Option<&str>) -> Result<(), CommandError> {
    let name = RoleName::parse(name)?;
    let (config, pool) = connect().await?;

    let role = RoleRepository::new(&pool, config.directory.unique_role_names)
        .create(&name, description)
        .await?;

    tracing::info!("Created role {} (id {})", role.name, role.id);
    Ok(())
}
