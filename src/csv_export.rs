//! Inventory export as CSV
//!
//! Format (CRLF after every line):
//!
//! ```text
//! JAN,商品名,数量,単位,実数量,登録日時
//! <code>,"<name>",<quantity>,<unit>,<derivedQuantity>,<recordedAt>
//! ```
//!
//! The name column is always quoted. Other columns are quoted only when they
//! contain a comma, quote or line break. Embedded quotes are doubled.

use crate::config::{DateFormat, ExportSettings};
use crate::error::{LedgerError, Result};
use crate::inventory::InventoryRepository;
use crate::master::MasterRepository;
use crate::models::InventoryEntry;
use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const EXPORT_HEADER: [&str; 6] = ["JAN", "商品名", "数量", "単位", "実数量", "登録日時"];

const LINE_END: &str = "\r\n";

/// Numbered names tried before giving up on a crowded directory
const MAX_NAME_ATTEMPTS: u32 = 100;

/// What to do with the inventory once the file is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AfterExport {
    #[default]
    Keep,
    /// Clear every entry. Irreversible; callers must confirm before asking.
    Purge,
}

/// Rendered export, not yet written anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
    pub rows: usize,
}

/// Result of writing an export to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub rows: usize,
    /// Entries removed by `AfterExport::Purge` (0 for `Keep`)
    pub purged: usize,
}

pub struct Exporter {
    inventory: InventoryRepository,
    master: MasterRepository,
    settings: ExportSettings,
}

impl Exporter {
    pub fn new(
        inventory: InventoryRepository,
        master: MasterRepository,
        settings: ExportSettings,
    ) -> Self {
        Self {
            inventory,
            master,
            settings,
        }
    }

    /// Render every entry; `NoData` when the inventory is empty
    pub async fn render(&self) -> Result<CsvExport> {
        let entries = self.inventory.list_all().await?;
        if entries.is_empty() {
            return Err(LedgerError::NoData);
        }

        let mut names: HashMap<String, String> = HashMap::new();
        let mut contents = String::new();
        contents.push_str(&EXPORT_HEADER.join(","));
        contents.push_str(LINE_END);

        for entry in &entries {
            let name = match &entry.product_name {
                Some(name) if !name.trim().is_empty() => name.clone(),
                _ => self.resolve_name(&entry.code, &mut names).await?,
            };
            contents.push_str(&format_row(entry, &name, self.settings.date_format));
            contents.push_str(LINE_END);
        }

        Ok(CsvExport {
            file_name: export_file_name(Local::now()),
            contents,
            rows: entries.len(),
        })
    }

    /// Render, write the file into `dir`, then apply `after`.
    ///
    /// Nothing is written and nothing is purged when there is no data. The
    /// purge runs only once the file is on disk. An existing file is never
    /// replaced; a second export in the same second gets a numbered name.
    pub async fn export_to_dir(&self, dir: &Path, after: AfterExport) -> Result<ExportOutcome> {
        let export = self.render().await?;

        std::fs::create_dir_all(dir)?;
        let (path, mut file) = create_export_file(dir, &export.file_name)?;
        file.write_all(export.contents.as_bytes())?;
        file.sync_all()?;
        log::info!("Exported {} entries to {}", export.rows, path.display());

        let purged = match after {
            AfterExport::Keep => 0,
            AfterExport::Purge => {
                let purged = self.inventory.clear_all().await?;
                log::info!("Purged {} entries after export", purged);
                purged
            }
        };

        Ok(ExportOutcome {
            path,
            rows: export.rows,
            purged,
        })
    }

    /// Current master name for entries registered without one
    async fn resolve_name(
        &self,
        code: &str,
        cache: &mut HashMap<String, String>,
    ) -> Result<String> {
        if let Some(name) = cache.get(code) {
            return Ok(name.clone());
        }
        let name = match self.master.lookup_name(code).await? {
            Some(name) => name,
            None => self.settings.unregistered_label.clone(),
        };
        cache.insert(code.to_string(), name.clone());
        Ok(name)
    }
}

/// Create `file_name` in `dir`, or `<stem>_2.csv`, `<stem>_3.csv`, ... if taken
fn create_export_file(dir: &Path, file_name: &str) -> Result<(PathBuf, File)> {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = if attempt == 1 {
            file_name.to_string()
        } else {
            format!("{}_{}.csv", stem, attempt)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!("{} exists, trying the next name", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(LedgerError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free export file name for {} in {}", file_name, dir.display()),
    )))
}

fn format_row(entry: &InventoryEntry, name: &str, date_format: DateFormat) -> String {
    let recorded_at = format_recorded_at(&entry.recorded_at, date_format);
    format!(
        "{},{},{},{},{},{}",
        escape_field(&entry.code),
        quote_field(name),
        entry.quantity,
        escape_field(&entry.unit),
        entry.derived_quantity,
        escape_field(&recorded_at)
    )
}

/// Quote a field only if it would break the row otherwise
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(quote_field(field))
    } else {
        Cow::Borrowed(field)
    }
}

/// Always quote, doubling embedded quotes
pub fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Stored timestamp in the configured export style.
///
/// Values that are not RFC 3339 are written unchanged.
pub fn format_recorded_at(recorded_at: &str, date_format: DateFormat) -> String {
    match date_format {
        DateFormat::Iso => recorded_at.to_string(),
        DateFormat::Local => match DateTime::parse_from_rfc3339(recorded_at) {
            Ok(ts) => ts
                .with_timezone(&Local)
                .format("%Y/%m/%d %H:%M:%S")
                .to_string(),
            Err(e) => {
                log::warn!("Keeping unparseable timestamp {:?}: {}", recorded_at, e);
                recorded_at.to_string()
            }
        },
    }
}

/// `inventory_<YYYYMMDDHHMMSS>.csv`
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("inventory_{}.csv", now.format("%Y%m%d%H%M%S"))
}
