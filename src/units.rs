//! Unit table: unit label → integer multiplier to the base unit
//!
//! Deployments either count everything 1:1 (every unit maps to 1) or convert
//! packs to pieces (e.g. 箱 = 12, 甲 = 48). Both are plain configuration.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit labels shipped with the default configuration (base unit first)
pub const DEFAULT_UNITS: [&str; 3] = ["個", "箱", "甲"];

/// Largest derived quantity the store can hold (signed 64-bit integer column)
const MAX_DERIVED: u64 = i64::MAX as u64;

/// Validated mapping from unit label to multiplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UnitTableFile", into = "UnitTableFile")]
pub struct UnitTable {
    base_unit: String,
    multipliers: BTreeMap<String, u32>,
}

/// On-disk shape of the unit table
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnitTableFile {
    base_unit: String,
    multipliers: BTreeMap<String, u32>,
}

impl UnitTable {
    /// Build a table, checking that the base unit is present with multiplier 1
    /// and that no multiplier is zero.
    pub fn new(base_unit: &str, multipliers: BTreeMap<String, u32>) -> Result<Self> {
        let base_unit = base_unit.trim();
        match multipliers.get(base_unit) {
            Some(1) => {}
            Some(m) => {
                return Err(LedgerError::InvalidConfig(format!(
                    "base unit '{}' must have multiplier 1, got {}",
                    base_unit, m
                )))
            }
            None => {
                return Err(LedgerError::InvalidConfig(format!(
                    "base unit '{}' is missing from the unit table",
                    base_unit
                )))
            }
        }

        if let Some((label, _)) = multipliers.iter().find(|(_, m)| **m == 0) {
            return Err(LedgerError::InvalidConfig(format!(
                "unit '{}' has multiplier 0",
                label
            )));
        }
        if multipliers.keys().any(|label| label.trim().is_empty()) {
            return Err(LedgerError::InvalidConfig(
                "unit labels must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_unit: base_unit.to_string(),
            multipliers,
        })
    }

    /// Every default unit maps to 1 (no conversion)
    pub fn identity() -> Self {
        Self {
            base_unit: DEFAULT_UNITS[0].to_string(),
            multipliers: DEFAULT_UNITS.iter().map(|u| (u.to_string(), 1)).collect(),
        }
    }

    /// Pieces / boxes of 12 / cases of 48
    pub fn packs() -> Self {
        Self {
            base_unit: DEFAULT_UNITS[0].to_string(),
            multipliers: DEFAULT_UNITS
                .iter()
                .zip([1, 12, 48])
                .map(|(u, m)| (u.to_string(), m))
                .collect(),
        }
    }

    pub fn base_unit(&self) -> &str {
        &self.base_unit
    }

    pub fn contains(&self, unit: &str) -> bool {
        self.multipliers.contains_key(unit)
    }

    /// Multiplier for a unit label
    pub fn multiplier(&self, unit: &str) -> Result<u32> {
        self.multipliers
            .get(unit)
            .copied()
            .ok_or_else(|| LedgerError::UnknownUnit(unit.to_string()))
    }

    /// Base-unit quantity for `quantity` counted in `unit`.
    ///
    /// The result must fit a signed 64-bit store column; larger products are
    /// a validation error.
    pub fn derive(&self, quantity: u32, unit: &str) -> Result<u64> {
        let multiplier = self.multiplier(unit)?;
        let derived = u64::from(quantity) * u64::from(multiplier);
        if derived > MAX_DERIVED {
            return Err(LedgerError::Validation(format!(
                "{} {} is too large to store ({} base units)",
                quantity, unit, derived
            )));
        }
        Ok(derived)
    }

    /// Whether every unit maps to 1
    pub fn is_identity(&self) -> bool {
        self.multipliers.values().all(|m| *m == 1)
    }

    /// Labels with their multipliers, base unit first
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        let base = self
            .multipliers
            .get_key_value(&self.base_unit)
            .map(|(label, m)| (label.as_str(), *m));
        let rest = self
            .multipliers
            .iter()
            .filter(move |(label, _)| **label != self.base_unit)
            .map(|(label, m)| (label.as_str(), *m));
        base.into_iter().chain(rest)
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<UnitTableFile> for UnitTable {
    type Error = LedgerError;

    fn try_from(file: UnitTableFile) -> Result<Self> {
        UnitTable::new(&file.base_unit, file.multipliers)
    }
}

impl From<UnitTable> for UnitTableFile {
    fn from(table: UnitTable) -> Self {
        UnitTableFile {
            base_unit: table.base_unit,
            multipliers: table.multipliers,
        }
    }
}
