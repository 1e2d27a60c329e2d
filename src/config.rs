//! Ledger settings, loaded from an optional JSON file
//!
//! Every field has a default, so an empty object (or no file at all) gives the
//! stock configuration: 1:1 units, any non-empty code, quantities below 1
//! rejected, ISO timestamps in exports.

use crate::error::{LedgerError, Result};
use crate::units::UnitTable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How strictly product codes are checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePolicy {
    /// Any non-empty code
    #[default]
    Any,
    /// JAN/EAN shape: 8 to 13 ASCII digits
    Jan,
}

/// What happens to a quantity below 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityPolicy {
    /// Fail with a validation error
    #[default]
    Reject,
    /// Silently raise it to 1
    Clamp,
}

/// How `recorded_at` is written to the export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// Stored ISO-8601 UTC value, unchanged
    #[default]
    Iso,
    /// Local time as `YYYY/MM/DD HH:MM:SS`
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub date_format: DateFormat,
    /// Name written for codes with no master record
    pub unregistered_label: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            date_format: DateFormat::Iso,
            unregistered_label: "未登録".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub units: UnitTable,
    pub code_policy: CodePolicy,
    pub quantity_policy: QuantityPolicy,
    pub export: ExportSettings,
}

impl LedgerConfig {
    /// Load settings from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json).map_err(|e| {
            LedgerError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        log::info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Settings from `path` if given, otherwise the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                log::debug!("No settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }
}
