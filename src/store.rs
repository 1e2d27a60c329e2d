//! SQLite-backed persistent store
//!
//! Holds two independent collections: `inventory` (counted entries, keyed by a
//! generated integer id) and `master` (product master records, keyed by code).
//! Uses parameterized queries exclusively. All writes run inside a transaction
//! that commits on success and rolls back on every other exit path.

use crate::error::{LedgerError, Result};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Schema version recorded in `PRAGMA user_version`
const SCHEMA_VERSION: i64 = 1;

/// Shared handle to the ledger database.
///
/// Cloning is cheap; every clone talks to the same connection. The mutex
/// serializes transactions, so there is at most one writer at a time.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and initialize the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LedgerError::StoreUnavailable(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                log::info!("Created directory: {}", parent.display());
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            LedgerError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))?;
        log::debug!("Journal mode: {}", mode);

        log::info!("Opened database: {}", path.display());
        Self::from_connection(conn)
    }

    /// Isolated in-memory store (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::StoreUnavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn).map_err(|e| LedgerError::StoreUnavailable(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a read-only closure against the connection on the blocking pool.
    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = lock_connection(&conn);
            f(&guard)
        })
        .await
        .map_err(|e| LedgerError::TaskAborted(e.to_string()))?
    }

    /// Run a closure inside one transaction on the blocking pool.
    ///
    /// Commits when the closure returns `Ok`. An `Err` or a panic drops the
    /// transaction, which rolls it back, so no partial write is ever visible.
    /// The store stays usable after a panicking closure. Dropping the returned
    /// future does not cancel the write.
    pub async fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_connection(&conn);
            let tx = guard.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .map_err(|e| LedgerError::TaskAborted(e.to_string()))?
    }
}

/// Lock the connection, taking it back from a writer that panicked.
///
/// The panicking transaction was dropped during unwinding and rolled back,
/// so the connection holds no partial state.
fn lock_connection(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| {
        log::warn!("Recovering store connection after a panicked operation");
        conn.clear_poison();
        poisoned.into_inner()
    })
}

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `inventory`: counted entries (auto-increment id, never reused)
/// - `master`: product master records keyed by code
///
/// Safe to run against an existing database: nothing is dropped or rewritten.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS inventory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            unit TEXT NOT NULL,
            product_name TEXT,
            derived_quantity INTEGER NOT NULL,
            recorded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_inventory_code ON inventory(code);
        CREATE INDEX IF NOT EXISTS idx_inventory_recorded_at ON inventory(recorded_at);

        CREATE TABLE IF NOT EXISTS master (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            price TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            note TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        log::info!(
            "Database schema initialized (version {} -> {})",
            version,
            SCHEMA_VERSION
        );
    } else {
        log::debug!("Database schema up to date (version {})", version);
    }
    Ok(())
}

/// Returns the default database path: ~/.local/share/inventcount/inventory.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("inventcount")
        .join("inventory.db")
}
