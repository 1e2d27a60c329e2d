//! Error types for inventcount

use thiserror::Error;

/// Unified error type for ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The store could not be opened (permissions, disk, corrupt file) or its
    /// handle is no longer usable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    /// Malformed code or quantity; nothing was written
    #[error("Invalid input: {0}")]
    Validation(String),
    /// No inventory entry with this id
    #[error("Entry not found: {0}")]
    NotFound(i64),
    /// Bulk delete referenced ids that do not exist; nothing was removed
    #[error("Entries not found: {0:?}")]
    NotFoundMany(Vec<i64>),
    /// Unit label missing from the unit table
    #[error("Configuration error: unknown unit '{0}'")]
    UnknownUnit(String),
    /// Export attempted on an empty inventory
    #[error("No inventory entries to export")]
    NoData,
    /// Settings file is malformed or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse or write JSON
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// The blocking task running a store operation did not finish
    #[error("Store task aborted: {0}")]
    TaskAborted(String),
}

impl LedgerError {
    /// Errors the caller can fix by correcting input and retrying right away
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::NotFound(_)
                | LedgerError::NotFoundMany(_)
                | LedgerError::UnknownUnit(_)
                | LedgerError::NoData
        )
    }
}

/// Result alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;
