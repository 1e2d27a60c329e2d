//! InventCount - stocktaking ledger
//!
//! Records counted stock (code, quantity, unit) in a local SQLite database,
//! enriches entries with names from an imported product master, and exports
//! the count list as CSV.

pub mod config;
pub mod csv_export;
pub mod csv_import;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod master;
pub mod models;
pub mod registration;
pub mod store;
pub mod units;

pub use config::{CodePolicy, DateFormat, ExportSettings, LedgerConfig, QuantityPolicy};
pub use csv_export::{AfterExport, CsvExport, ExportOutcome, Exporter};
pub use csv_import::{parse_master_csv, ImportReport, MasterImporter};
pub use error::{LedgerError, Result};
pub use inventory::InventoryRepository;
pub use ledger::Ledger;
pub use master::MasterRepository;
pub use models::{EntryPatch, InventoryEntry, MasterRecord, NewEntry};
pub use registration::{EditDraft, EntryDraft, Feedback, Preview, Registrar, Registration};
pub use store::Store;
pub use units::UnitTable;
