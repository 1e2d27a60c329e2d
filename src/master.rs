//! Master repository: product master records in the `master` collection

use crate::error::Result;
use crate::models::MasterRecord;
use crate::store::Store;
use rusqlite::{params, OptionalExtension, Transaction};

/// Bulk import and point lookup of master records
#[derive(Clone)]
pub struct MasterRepository {
    store: Store,
}

impl MasterRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Upsert a batch of master records in a single transaction
    ///
    /// Rows whose code is empty after trimming are skipped and not counted.
    /// A code seen again (in this batch or an earlier one) overwrites the
    /// previous record. Returns the number of rows written.
    pub async fn import_batch(&self, rows: Vec<MasterRecord>) -> Result<usize> {
        let count = self
            .store
            .write(move |tx| import_batch_tx(tx, &rows))
            .await?;
        log::info!("Imported {} master records", count);
        Ok(count)
    }

    /// Look up a master record by code; `None` when the code is unknown
    pub async fn lookup(&self, code: &str) -> Result<Option<MasterRecord>> {
        let code = code.trim().to_string();
        let record = self
            .store
            .read(move |conn| {
                let record = conn
                    .query_row(
                        "SELECT code, name, price, category, note FROM master WHERE code = ?1",
                        params![&code],
                        |row| {
                            Ok(MasterRecord {
                                code: row.get(0)?,
                                name: row.get(1)?,
                                price: row.get(2)?,
                                category: row.get(3)?,
                                note: row.get(4)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    /// Registered product name for a code.
    ///
    /// A record with a blank name counts as unregistered.
    pub async fn lookup_name(&self, code: &str) -> Result<Option<String>> {
        let name = self
            .lookup(code)
            .await?
            .map(|record| record.name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(name)
    }

    /// Number of master records
    pub async fn count(&self) -> Result<i64> {
        self.store
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM master", [], |row| row.get(0))?))
            .await
    }
}

fn import_batch_tx(tx: &Transaction<'_>, rows: &[MasterRecord]) -> Result<usize> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO master (code, name, price, category, note, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
         ON CONFLICT(code) DO UPDATE SET
             name       = excluded.name,
             price      = excluded.price,
             category   = excluded.category,
             note       = excluded.note,
             updated_at = excluded.updated_at",
    )?;

    let mut count = 0;
    for row in rows {
        let code = row.code.trim();
        if code.is_empty() {
            log::debug!("Skipping master row without code (name: {:?})", row.name);
            continue;
        }
        stmt.execute(params![
            code,
            row.name.trim(),
            row.price.trim(),
            row.category.trim(),
            row.note.trim(),
        ])?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> MasterRepository {
        MasterRepository::new(Store::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn import_then_lookup() {
        let repo = repo();
        let count = repo
            .import_batch(vec![MasterRecord {
                code: "4901234567894".to_string(),
                name: "Widget".to_string(),
                price: "120".to_string(),
                category: "Tools".to_string(),
                note: String::new(),
            }])
            .await
            .unwrap();
        assert_eq!(count, 1);

        let record = repo.lookup("4901234567894").await.unwrap().unwrap();
        assert_eq!(record.name, "Widget");
        assert_eq!(record.price, "120");
        assert_eq!(record.category, "Tools");
        assert_eq!(record.note, "");
    }

    #[tokio::test]
    async fn lookup_unknown_code_is_none() {
        let repo = repo();
        assert!(repo.lookup("0000000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_name_treats_blank_name_as_unregistered() {
        let repo = repo();
        repo.import_batch(vec![
            MasterRecord::named("1111", ""),
            MasterRecord::named("2222", "Named"),
        ])
        .await
        .unwrap();

        assert!(repo.lookup("1111").await.unwrap().is_some());
        assert_eq!(repo.lookup_name("1111").await.unwrap(), None);
        assert_eq!(repo.lookup_name("2222").await.unwrap().as_deref(), Some("Named"));
        assert_eq!(repo.lookup_name("3333").await.unwrap(), None);
    }

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let repo = repo();
        let rows = vec![
            MasterRecord::named("1111", "First"),
            MasterRecord::named("2222", "Second"),
        ];

        assert_eq!(repo.import_batch(rows.clone()).await.unwrap(), 2);
        assert_eq!(repo.import_batch(rows).await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reimport_overwrites_by_code() {
        let repo = repo();
        repo.import_batch(vec![MasterRecord::named("1111", "Old")])
            .await
            .unwrap();
        repo.import_batch(vec![MasterRecord::named("1111", "New")])
            .await
            .unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.lookup("1111").await.unwrap().unwrap().name, "New");
    }

    #[tokio::test]
    async fn duplicate_codes_in_one_batch_keep_last() {
        let repo = repo();
        let count = repo
            .import_batch(vec![
                MasterRecord::named("1111", "First"),
                MasterRecord::named("1111", "Second"),
            ])
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.lookup("1111").await.unwrap().unwrap().name, "Second");
    }

    #[tokio::test]
    async fn empty_codes_are_skipped() {
        let repo = repo();
        let count = repo
            .import_batch(vec![
                MasterRecord::named("", "No code"),
                MasterRecord::named("   ", "Blank code"),
                MasterRecord::named(" 3333 ", "Padded"),
            ])
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(repo.lookup("3333").await.unwrap().unwrap().name, "Padded");
    }
}
