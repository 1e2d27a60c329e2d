//! Registration flow: validate → enrich from master → derive → persist
//!
//! Scanned and typed codes go through the same path. A missing master record
//! never blocks a write; it only changes the feedback returned to the caller.

use crate::config::{CodePolicy, LedgerConfig, QuantityPolicy};
use crate::error::{LedgerError, Result};
use crate::inventory::InventoryRepository;
use crate::master::MasterRepository;
use crate::models::{EntryPatch, InventoryEntry, NewEntry};

/// Codes shorter than this get no name hint while typing
pub const PREVIEW_MIN_LEN: usize = 6;

/// Raw input for a new entry, as typed or scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub code: String,
    pub quantity: i64,
    /// `None` (or blank) means the base unit
    pub unit: Option<String>,
}

impl EntryDraft {
    pub fn new(code: &str, quantity: i64) -> Self {
        Self {
            code: code.to_string(),
            quantity,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// Raw input for editing an entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditDraft {
    pub quantity: Option<i64>,
    pub unit: Option<String>,
}

/// Whether the code was found in the product master
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Found(String),
    NotFound,
}

/// Name hint shown while a code is being typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Too short to look up yet
    Pending,
    Found(String),
    NotRegistered,
}

/// Stored entry plus the master feedback for its code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub entry: InventoryEntry,
    pub feedback: Feedback,
}

/// Check a code against the policy and return it trimmed
pub fn validate_code(code: &str, policy: CodePolicy) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(LedgerError::Validation("code must not be empty".to_string()));
    }
    if policy == CodePolicy::Jan
        && !((8..=13).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit()))
    {
        return Err(LedgerError::Validation(format!(
            "code '{}' must be 8 to 13 digits",
            code
        )));
    }
    Ok(code.to_string())
}

/// Apply the quantity policy to a raw quantity
pub fn normalize_quantity(quantity: i64, policy: QuantityPolicy) -> Result<u32> {
    let quantity = match (quantity < 1, policy) {
        (true, QuantityPolicy::Clamp) => {
            log::debug!("Clamping quantity {} to 1", quantity);
            1
        }
        (true, QuantityPolicy::Reject) => {
            return Err(LedgerError::Validation(format!(
                "quantity must be at least 1, got {}",
                quantity
            )))
        }
        (false, _) => quantity,
    };
    u32::try_from(quantity)
        .map_err(|_| LedgerError::Validation(format!("quantity {} is too large", quantity)))
}

/// Registers and edits entries on top of the two repositories
#[derive(Clone)]
pub struct Registrar {
    inventory: InventoryRepository,
    master: MasterRepository,
    code_policy: CodePolicy,
    quantity_policy: QuantityPolicy,
}

impl Registrar {
    pub fn new(inventory: InventoryRepository, master: MasterRepository, config: &LedgerConfig) -> Self {
        Self {
            inventory,
            master,
            code_policy: config.code_policy,
            quantity_policy: config.quantity_policy,
        }
    }

    /// Validate, enrich and store a new entry
    pub async fn register(&self, draft: EntryDraft) -> Result<Registration> {
        let code = validate_code(&draft.code, self.code_policy)?;
        let quantity = normalize_quantity(draft.quantity, self.quantity_policy)?;

        let feedback = self.feedback_for(&code).await?;
        let product_name = match &feedback {
            Feedback::Found(name) => Some(name.clone()),
            Feedback::NotFound => None,
        };

        let unit = self.resolve_unit(draft.unit.as_deref())?;
        let id = self
            .inventory
            .create(NewEntry {
                code,
                quantity,
                unit,
                product_name,
            })
            .await?;
        let entry = self
            .inventory
            .get(id)
            .await?
            .ok_or(LedgerError::NotFound(id))?;

        Ok(Registration { entry, feedback })
    }

    /// Change quantity and/or unit of an existing entry.
    ///
    /// The product name captured at registration is kept as is.
    pub async fn edit(&self, id: i64, draft: EditDraft) -> Result<Registration> {
        let quantity = draft
            .quantity
            .map(|q| normalize_quantity(q, self.quantity_policy))
            .transpose()?;
        let unit = match draft.unit.as_deref().map(str::trim) {
            Some(unit) if !unit.is_empty() => Some(self.resolve_unit(Some(unit))?),
            _ => None,
        };

        let entry = self.inventory.update(id, EntryPatch { quantity, unit }).await?;
        let feedback = self.feedback_for(&entry.code).await?;
        Ok(Registration { entry, feedback })
    }

    /// Name hint for a partially typed or freshly scanned code
    pub async fn preview(&self, code: &str) -> Result<Preview> {
        let code = code.trim();
        if code.chars().count() < PREVIEW_MIN_LEN {
            return Ok(Preview::Pending);
        }
        Ok(match self.master.lookup_name(code).await? {
            Some(name) => Preview::Found(name),
            None => Preview::NotRegistered,
        })
    }

    async fn feedback_for(&self, code: &str) -> Result<Feedback> {
        let feedback = match self.master.lookup_name(code).await? {
            Some(name) => Feedback::Found(name),
            None => {
                log::debug!("Code {} not in product master", code);
                Feedback::NotFound
            }
        };
        Ok(feedback)
    }

    fn resolve_unit(&self, unit: Option<&str>) -> Result<String> {
        let units = self.inventory.units();
        match unit.map(str::trim).filter(|u| !u.is_empty()) {
            Some(unit) => {
                units.multiplier(unit)?;
                Ok(unit.to_string())
            }
            None => Ok(units.base_unit().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MasterRecord;
    use crate::store::Store;
    use crate::units::UnitTable;

    fn registrar(config: LedgerConfig) -> (Registrar, MasterRepository) {
        let store = Store::open_in_memory().unwrap();
        let inventory = InventoryRepository::new(store.clone(), config.units.clone());
        let master = MasterRepository::new(store);
        (Registrar::new(inventory, master.clone(), &config), master)
    }

    fn packs_config() -> LedgerConfig {
        LedgerConfig {
            units: UnitTable::packs(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_code_trims_and_accepts_any_non_empty() {
        assert_eq!(validate_code("  abc ", CodePolicy::Any).unwrap(), "abc");
        assert!(validate_code("   ", CodePolicy::Any).is_err());
    }

    #[test]
    fn validate_code_jan_policy_requires_8_to_13_digits() {
        assert!(validate_code("12345678", CodePolicy::Jan).is_ok());
        assert!(validate_code("4901234567894", CodePolicy::Jan).is_ok());
        assert!(validate_code("1234567", CodePolicy::Jan).is_err());
        assert!(validate_code("49012345678941", CodePolicy::Jan).is_err());
        assert!(validate_code("49012345A7894", CodePolicy::Jan).is_err());
        // Full-width digits are not ASCII digits
        assert!(validate_code("１２３４５６７８", CodePolicy::Jan).is_err());
    }

    #[test]
    fn normalize_quantity_policies() {
        assert_eq!(normalize_quantity(3, QuantityPolicy::Reject).unwrap(), 3);
        assert!(normalize_quantity(0, QuantityPolicy::Reject).is_err());
        assert!(normalize_quantity(-2, QuantityPolicy::Reject).is_err());
        assert_eq!(normalize_quantity(0, QuantityPolicy::Clamp).unwrap(), 1);
        assert_eq!(normalize_quantity(-5, QuantityPolicy::Clamp).unwrap(), 1);
        assert!(normalize_quantity(i64::from(u32::MAX) + 1, QuantityPolicy::Clamp).is_err());
    }

    #[tokio::test]
    async fn register_without_master_record() {
        let (registrar, _) = registrar(packs_config());
        let registration = registrar
            .register(EntryDraft::new("4901234567894", 3).with_unit("箱"))
            .await
            .unwrap();

        assert_eq!(registration.feedback, Feedback::NotFound);
        assert_eq!(registration.entry.derived_quantity, 36);
        assert_eq!(registration.entry.product_name, None);
    }

    #[tokio::test]
    async fn register_snapshots_master_name() {
        let (registrar, master) = registrar(packs_config());
        master
            .import_batch(vec![MasterRecord::named("4901234567894", "Widget")])
            .await
            .unwrap();

        let registration = registrar
            .register(EntryDraft::new("4901234567894", 1).with_unit("個"))
            .await
            .unwrap();
        assert_eq!(registration.feedback, Feedback::Found("Widget".to_string()));
        assert_eq!(registration.entry.product_name.as_deref(), Some("Widget"));
    }

    #[tokio::test]
    async fn master_record_without_name_counts_as_unregistered() {
        let (registrar, master) = registrar(packs_config());
        master
            .import_batch(vec![MasterRecord::named("4901234567894", "  ")])
            .await
            .unwrap();

        let registration = registrar
            .register(EntryDraft::new("4901234567894", 1))
            .await
            .unwrap();
        assert_eq!(registration.feedback, Feedback::NotFound);
        assert_eq!(registration.entry.product_name, None);
        assert_eq!(
            registrar.preview("4901234567894").await.unwrap(),
            Preview::NotRegistered
        );
    }

    #[tokio::test]
    async fn register_defaults_to_base_unit() {
        let (registrar, _) = registrar(packs_config());
        let registration = registrar.register(EntryDraft::new("1111", 2)).await.unwrap();
        assert_eq!(registration.entry.unit, "個");
        assert_eq!(registration.entry.derived_quantity, 2);
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_before_writing() {
        let config = LedgerConfig {
            code_policy: CodePolicy::Jan,
            ..packs_config()
        };
        let (registrar, _) = registrar(config);

        let err = registrar.register(EntryDraft::new("12AB", 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = registrar
            .register(EntryDraft::new("4901234567894", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = registrar
            .register(EntryDraft::new("4901234567894", 1).with_unit("ケース"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownUnit(_)));

        assert_eq!(registrar.inventory.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn register_clamps_when_configured() {
        let config = LedgerConfig {
            quantity_policy: QuantityPolicy::Clamp,
            ..packs_config()
        };
        let (registrar, _) = registrar(config);
        let registration = registrar
            .register(EntryDraft::new("1111", -4).with_unit("箱"))
            .await
            .unwrap();
        assert_eq!(registration.entry.quantity, 1);
        assert_eq!(registration.entry.derived_quantity, 12);
    }

    #[tokio::test]
    async fn edit_recomputes_and_keeps_name_snapshot() {
        let (registrar, master) = registrar(packs_config());
        master
            .import_batch(vec![MasterRecord::named("1111", "Before")])
            .await
            .unwrap();
        let id = registrar
            .register(EntryDraft::new("1111", 1))
            .await
            .unwrap()
            .entry
            .id;

        master
            .import_batch(vec![MasterRecord::named("1111", "After")])
            .await
            .unwrap();
        let edited = registrar
            .edit(
                id,
                EditDraft {
                    quantity: Some(2),
                    unit: Some("甲".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.entry.derived_quantity, 96);
        assert_eq!(edited.entry.product_name.as_deref(), Some("Before"));
        assert_eq!(edited.feedback, Feedback::Found("After".to_string()));
    }

    #[tokio::test]
    async fn edit_rejects_bad_quantity_and_missing_id() {
        let (registrar, _) = registrar(packs_config());
        let id = registrar.register(EntryDraft::new("1111", 1)).await.unwrap().entry.id;

        let err = registrar
            .edit(
                id,
                EditDraft {
                    quantity: Some(0),
                    unit: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = registrar
            .edit(
                id + 100,
                EditDraft {
                    quantity: Some(2),
                    unit: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn preview_follows_typing() {
        let (registrar, master) = registrar(packs_config());
        master
            .import_batch(vec![MasterRecord::named("4901234567894", "Widget")])
            .await
            .unwrap();

        assert_eq!(registrar.preview("49012").await.unwrap(), Preview::Pending);
        assert_eq!(
            registrar.preview("4901234567894").await.unwrap(),
            Preview::Found("Widget".to_string())
        );
        assert_eq!(
            registrar.preview("4901234567000").await.unwrap(),
            Preview::NotRegistered
        );
    }
}
