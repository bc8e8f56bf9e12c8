//! User management commands.

use gazetteer_admin::db::{RoleRepository, UserRepository};
use gazetteer_admin::services::AuthService;
use gazetteer_core::RoleName;

use super::{CommandError, connect};

/// Create a user, optionally assigning an existing role.
///
/// # Errors
///
/// Returns an error if the email or password is invalid, the email is taken
/// or the role doesn't exist.
pub async fn create(email: &str, password: &str, role: Option<&str>) -> Result<(), CommandError> {
    let (config, pool) = connect().await?;

    // Look the role up first so a typo doesn't leave a role-less user behind.
    let role = match role {
        Some(name) => {
            let name = RoleName::parse(name)?;
            let found = RoleRepository::new(&pool, config.directory.unique_role_names)
                .get_by_name(&name)
                .await?
                .ok_or_else(|| CommandError::NotFound(format!("role '{name}'")))?;
            Some(found)
        }
        None => None,
    };

    let user = AuthService::new(&pool).create_user(email, password).await?;
    tracing::info!("Created user {} (id {})", user.email, user.id);

    if let Some(role) = role {
        UserRepository::new(&pool).assign_role(user.id, role.id).await?;
        tracing::info!("Assigned role {}", role.name);
    }

    Ok(())
}
