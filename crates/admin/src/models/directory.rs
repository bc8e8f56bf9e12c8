//! Address hierarchy, name registry, full names and items.

use chrono::{DateTime, Utc};
use serde::Serialize;

use gazetteer_core::{AddressId, FullNameId, ItemId, NameId, address_label};

/// An address node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    /// Node id.
    pub id: AddressId,
    /// Type tag (`country`, `city`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Parent node, `None` for roots.
    pub parent_id: Option<AddressId>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
}

/// An address together with its current full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSummary {
    /// The node.
    pub address: Address,
    /// Full name with the highest id, if any was ever materialized.
    pub latest_full_name: Option<String>,
}

impl AddressSummary {
    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> String {
        address_label(
            &self.address.kind,
            self.address.id,
            self.latest_full_name.as_deref(),
        )
    }
}

/// One registered name (append-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    /// Registration id; higher means later.
    pub id: NameId,
    /// The named address.
    pub address_id: AddressId,
    /// The name itself.
    pub name: String,
    /// When the name was registered.
    pub created_at: DateTime<Utc>,
}

/// One materialized full name (append-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FullNameEntry {
    /// Entry id; the highest per address is authoritative.
    pub id: FullNameId,
    /// The address this full name describes.
    pub address_id: AddressId,
    /// Ancestor chain and own name, e.g. `country Italy city Rome`.
    pub full_name: String,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// A catalog item placed at one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Item id.
    pub id: ItemId,
    /// Item name (doubles as its label).
    pub name: String,
    /// Where the item lives.
    pub address_id: AddressId,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
    /// When the item was last changed.
    pub updated_at: DateTime<Utc>,
}
