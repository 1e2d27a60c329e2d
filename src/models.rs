use serde::{Deserialize, Serialize};

/// One counted line of the stocktake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub id: i64,
    pub code: String,
    pub quantity: u32,
    pub unit: String,
    /// Master name captured when the entry was registered
    pub product_name: Option<String>,
    pub derived_quantity: u64,
    /// ISO-8601 UTC, set once at creation
    pub recorded_at: String,
}

/// Fields supplied when registering an entry; the store assigns the rest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub code: String,
    pub quantity: u32,
    pub unit: String,
    pub product_name: Option<String>,
}

/// Partial update of an entry. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub quantity: Option<u32>,
    pub unit: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit.is_none()
    }
}

/// Product master record, keyed by code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRecord {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub note: String,
}

impl MasterRecord {
    /// Record with only code and name set
    pub fn named(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}
