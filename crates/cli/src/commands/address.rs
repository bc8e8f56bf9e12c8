//! Address commands.
//!
//! # Usage
//!
//! ```bash
//! gz-cli address create -t country
//! gz-cli address create -t city --parent 1
//! gz-cli address name --id 1 -n Italy
//! gz-cli address show --id 2
//! ```

use gazetteer_admin::db::{AddressRepository, FullNameRepository, NameRepository};
use gazetteer_admin::services::DirectoryService;
use gazetteer_core::{AddressId, AddressKind, PlaceName};

use super::{CommandError, connect};

/// Create an address.
///
/// # Errors
///
/// Returns an error if the type is invalid or the parent doesn't exist.
pub async fn create(kind: &str, parent: Option<i32>) -> Result<(), CommandError> {
    let kind = AddressKind::parse(kind)?;
    let (config, pool) = connect().await?;

    let address = DirectoryService::new(&pool, config.directory)
        .create_address(&kind, parent.map(AddressId::new))
        .await?;

    tracing::info!("Created {} {}", address.kind, address.id);
    Ok(())
}

/// Register a name for an address.
///
/// # Errors
///
/// Returns an error if the name is empty, the address doesn't exist or the
/// cascade fails.
pub async fn name(id: i32, name: &str) -> Result<(), CommandError> {
    let name = PlaceName::parse(name)?;
    let (config, pool) = connect().await?;

    let registered = DirectoryService::new(&pool, config.directory)
        .register_name(AddressId::new(id), &name)
        .await?;

    tracing::info!(
        "Registered '{}' (name id {}), {} full names written",
        registered.name.name,
        registered.name.id,
        registered.full_names.len()
    );
    for entry in &registered.full_names {
        tracing::info!("  [{}] address {}: {}", entry.id, entry.address_id, entry.full_name);
    }
    Ok(())
}

/// Show an address, its ancestors and its name history.
///
/// # Errors
///
/// Returns `CommandError::NotFound` if the address doesn't exist.
pub async fn show(id: i32) -> Result<(), CommandError> {
    let id = AddressId::new(id);
    let (_, pool) = connect().await?;

    let chain = AddressRepository::new(&pool).ancestors(id).await?;
    let Some((node, ancestors)) = chain.split_first() else {
        return Err(CommandError::NotFound(format!("address {id}")));
    };

    tracing::info!("{} (type {}, id {})", node.label(), node.address.kind, id);
    for ancestor in ancestors {
        tracing::info!("  within {}", ancestor.label());
    }

    for entry in NameRepository::new(&pool).for_address(id).await? {
        tracing::info!("  name [{}]: {}", entry.id, entry.name);
    }
    for entry in FullNameRepository::new(&pool).for_address(id).await? {
        tracing::info!("  full name [{}]: {}", entry.id, entry.full_name);
    }
    Ok(())
}
