//! Inventory repository: counted entries in the `inventory` collection
//!
//! Every write recomputes `derived_quantity` from the unit table, so the stored
//! value always equals `quantity * multiplier(unit)`.

use crate::error::{LedgerError, Result};
use crate::models::{EntryPatch, InventoryEntry, NewEntry};
use crate::store::Store;
use crate::units::UnitTable;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

const ENTRY_COLUMNS: &str =
    "id, code, quantity, unit, product_name, derived_quantity, recorded_at";

/// CRUD over inventory entries
#[derive(Clone)]
pub struct InventoryRepository {
    store: Store,
    units: Arc<UnitTable>,
}

impl InventoryRepository {
    pub fn new(store: Store, units: UnitTable) -> Self {
        Self {
            store,
            units: Arc::new(units),
        }
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    /// Persist a new entry and return its generated id.
    ///
    /// Fails with `UnknownUnit` before anything is written if the unit is not
    /// in the table.
    pub async fn create(&self, entry: NewEntry) -> Result<i64> {
        if entry.quantity == 0 {
            return Err(LedgerError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let derived = self.units.derive(entry.quantity, &entry.unit)?;
        let recorded_at = now_timestamp();

        let id = self
            .store
            .write(move |tx| {
                tx.execute(
                    "INSERT INTO inventory
                     (code, quantity, unit, product_name, derived_quantity, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        &entry.code,
                        entry.quantity,
                        &entry.unit,
                        &entry.product_name,
                        derived,
                        &recorded_at,
                    ],
                )?;
                Ok(tx.last_insert_rowid())
            })
            .await?;

        log::info!("Registered entry {} (derived quantity {})", id, derived);
        Ok(id)
    }

    /// Fetch one entry by id
    pub async fn get(&self, id: i64) -> Result<Option<InventoryEntry>> {
        self.store.read(move |conn| find_entry(conn, id)).await
    }

    /// Snapshot of every entry in insertion order
    pub async fn list_all(&self) -> Result<Vec<InventoryEntry>> {
        let entries = self
            .store
            .read(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM inventory ORDER BY id ASC",
                    ENTRY_COLUMNS
                ))?;
                let entries = stmt
                    .query_map([], entry_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(entries)
            })
            .await?;
        log::debug!("Loaded {} inventory entries", entries.len());
        Ok(entries)
    }

    /// Merge `patch` into the stored entry and recompute its derived quantity.
    ///
    /// The read and the write happen in one transaction. Returns the entry as
    /// stored after the update.
    pub async fn update(&self, id: i64, patch: EntryPatch) -> Result<InventoryEntry> {
        if patch.quantity == Some(0) {
            return Err(LedgerError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let units = Arc::clone(&self.units);

        let updated = self
            .store
            .write(move |tx| {
                let mut entry = find_entry(tx, id)?.ok_or(LedgerError::NotFound(id))?;

                if let Some(quantity) = patch.quantity {
                    entry.quantity = quantity;
                }
                if let Some(unit) = patch.unit {
                    entry.unit = unit;
                }
                entry.derived_quantity = units.derive(entry.quantity, &entry.unit)?;

                tx.execute(
                    "UPDATE inventory
                     SET quantity = ?1, unit = ?2, derived_quantity = ?3
                     WHERE id = ?4",
                    params![entry.quantity, &entry.unit, entry.derived_quantity, id],
                )?;
                Ok(entry)
            })
            .await?;

        log::info!(
            "Updated entry {}: {} {} (derived quantity {})",
            id,
            updated.quantity,
            updated.unit,
            updated.derived_quantity
        );
        Ok(updated)
    }

    /// Remove one entry. A missing id is reported as `NotFound`.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store
            .write(move |tx| {
                let removed = tx.execute("DELETE FROM inventory WHERE id = ?1", params![id])?;
                if removed == 0 {
                    return Err(LedgerError::NotFound(id));
                }
                Ok(())
            })
            .await?;
        log::info!("Deleted entry {}", id);
        Ok(())
    }

    /// Remove several entries atomically.
    ///
    /// If any id does not exist the whole batch is rolled back and the missing
    /// ids are returned in `NotFoundMany`. Duplicate ids count once.
    pub async fn delete_many(&self, ids: &[i64]) -> Result<usize> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(0);
        }

        let removed = self
            .store
            .write(move |tx| {
                let mut stmt = tx.prepare_cached("DELETE FROM inventory WHERE id = ?1")?;
                let mut missing = Vec::new();
                for id in &ids {
                    if stmt.execute(params![id])? == 0 {
                        missing.push(*id);
                    }
                }
                if !missing.is_empty() {
                    return Err(LedgerError::NotFoundMany(missing));
                }
                Ok(ids.len())
            })
            .await?;

        log::info!("Deleted {} entries", removed);
        Ok(removed)
    }

    /// Remove every entry; master records are untouched
    pub async fn clear_all(&self) -> Result<usize> {
        let removed = self
            .store
            .write(|tx| Ok(tx.execute("DELETE FROM inventory", [])?))
            .await?;
        log::info!("Cleared inventory ({} entries removed)", removed);
        Ok(removed)
    }

    /// Number of stored entries
    pub async fn count(&self) -> Result<i64> {
        self.store
            .read(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM inventory", [], |row| {
                    row.get(0)
                })?)
            })
            .await
    }
}

fn find_entry(conn: &Connection, id: i64) -> Result<Option<InventoryEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {} FROM inventory WHERE id = ?1", ENTRY_COLUMNS),
            params![id],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<InventoryEntry> {
    Ok(InventoryEntry {
        id: row.get(0)?,
        code: row.get(1)?,
        quantity: row.get(2)?,
        unit: row.get(3)?,
        product_name: row.get(4)?,
        derived_quantity: row.get(5)?,
        recorded_at: row.get(6)?,
    })
}

/// Current time as ISO-8601 UTC with milliseconds, e.g. `2026-10-18T05:12:00.123Z`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
