//! Application root: one store handle shared by every component

use crate::config::LedgerConfig;
use crate::csv_export::Exporter;
use crate::csv_import::MasterImporter;
use crate::error::Result;
use crate::inventory::InventoryRepository;
use crate::master::MasterRepository;
use crate::registration::Registrar;
use crate::store::Store;
use std::path::Path;

/// The ledger's components, all wired to the same store
pub struct Ledger {
    pub inventory: InventoryRepository,
    pub master: MasterRepository,
    pub registrar: Registrar,
    pub importer: MasterImporter,
    pub exporter: Exporter,
}

impl Ledger {
    /// Open the database at `path` and build every component from `config`
    pub fn open(path: &Path, config: &LedgerConfig) -> Result<Self> {
        Ok(Self::with_store(Store::open(path)?, config))
    }

    /// Ledger over a fresh in-memory store
    pub fn in_memory(config: &LedgerConfig) -> Result<Self> {
        Ok(Self::with_store(Store::open_in_memory()?, config))
    }

    pub fn with_store(store: Store, config: &LedgerConfig) -> Self {
        let inventory = InventoryRepository::new(store.clone(), config.units.clone());
        let master = MasterRepository::new(store);
        Self {
            registrar: Registrar::new(inventory.clone(), master.clone(), config),
            importer: MasterImporter::new(master.clone(), config.code_policy),
            exporter: Exporter::new(inventory.clone(), master.clone(), config.export.clone()),
            inventory,
            master,
        }
    }
}
