//! Display labels for directory entities.

use crate::types::AddressId;

/// Label an address by its latest full name, or `"{type} {id}"` if it has
/// never been named.
#[must_use]
pub fn address_label(kind: &str, id: AddressId, latest_full_name: Option<&str>) -> String {
    latest_full_name.map_or_else(|| format!("{kind} {id}"), str::to_owned)
}
