//! Product master import from delimited text
//!
//! Expected columns: `code,name,price,category,note`. Everything after `code`
//! is optional. Each line is parsed on its own, so a broken line (stray
//! quote, wrong code shape) is skipped without touching its neighbours.

use crate::config::CodePolicy;
use crate::error::Result;
use crate::master::MasterRepository;
use crate::models::MasterRecord;
use crate::registration::validate_code;
use std::path::Path;

/// Words that mark the first line as a header row
const HEADER_KEYWORDS: [&str; 7] = ["code", "name", "price", "category", "note", "jan", "商品名"];

/// Rows accepted from a payload plus the number rejected
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedMaster {
    pub rows: Vec<MasterRecord>,
    pub skipped: usize,
}

/// Outcome of an import, reported to the user
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Parse a master payload without touching the store
pub fn parse_master_csv(payload: &str, policy: CodePolicy) -> ParsedMaster {
    let payload = payload.strip_prefix('\u{feff}').unwrap_or(payload);
    let mut parsed = ParsedMaster::default();

    let mut lines = payload
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();

    if let Some((_, first)) = lines.peek() {
        if split_fields(first).is_some_and(|fields| is_header(&fields)) {
            log::debug!("Dropping header line: {}", first);
            lines.next();
        }
    }

    for (index, line) in lines {
        let line_no = index + 1;
        let Some(fields) = split_fields(line) else {
            log::warn!("Line {}: unreadable, skipped", line_no);
            parsed.skipped += 1;
            continue;
        };

        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let code = match validate_code(&field(0), policy) {
            Ok(code) => code,
            Err(e) => {
                log::debug!("Line {}: {}, skipped", line_no, e);
                parsed.skipped += 1;
                continue;
            }
        };

        parsed.rows.push(MasterRecord {
            code,
            name: field(1),
            price: field(2),
            category: field(3),
            note: field(4),
        });
    }

    parsed
}

/// Split one line into cleaned fields: surrounding quotes and whitespace removed
fn split_fields(line: &str) -> Option<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let record = reader.records().next()?.ok()?;
    Some(
        record
            .iter()
            .map(|field| field.trim().trim_matches('"').trim().to_string())
            .collect(),
    )
}

/// A header mentions a field name and does not start with something code-like
fn is_header(fields: &[String]) -> bool {
    let first_has_digits = fields
        .first()
        .is_some_and(|f| f.bytes().any(|b| b.is_ascii_digit()));
    !first_has_digits
        && fields.iter().any(|f| {
            let f = f.to_lowercase();
            HEADER_KEYWORDS.iter().any(|k| f.contains(k))
        })
}

/// Imports master payloads into the repository
#[derive(Clone)]
pub struct MasterImporter {
    repo: MasterRepository,
    policy: CodePolicy,
}

impl MasterImporter {
    pub fn new(repo: MasterRepository, policy: CodePolicy) -> Self {
        Self { repo, policy }
    }

    /// Parse `payload` and upsert every valid row in one batch
    pub async fn import_str(&self, payload: &str) -> Result<ImportReport> {
        let parsed = parse_master_csv(payload, self.policy);
        let skipped = parsed.skipped;
        let imported = if parsed.rows.is_empty() {
            0
        } else {
            self.repo.import_batch(parsed.rows).await?
        };

        if skipped > 0 {
            log::warn!("Master import: {} imported, {} skipped", imported, skipped);
        } else {
            log::info!("Master import: {} imported", imported);
        }
        Ok(ImportReport { imported, skipped })
    }

    /// Read a UTF-8 file from disk and import it
    pub async fn import_file(&self, path: &Path) -> Result<ImportReport> {
        let payload = std::fs::read_to_string(path)?;
        log::info!("Importing product master from {}", path.display());
        self.import_str(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn importer(policy: CodePolicy) -> (MasterImporter, MasterRepository) {
        let repo = MasterRepository::new(Store::open_in_memory().unwrap());
        (MasterImporter::new(repo.clone(), policy), repo)
    }

    #[test]
    fn parses_full_rows_and_drops_header() {
        let payload = "code,name,price,category,note\r\n\
                       4901234567894,Widget,120,Tools,fragile\r\n\
                       4901234567900,Gadget,80,Toys,\r\n";
        let parsed = parse_master_csv(payload, CodePolicy::Any);

        assert_eq!(parsed.skipped, 0);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(
            parsed.rows[0],
            MasterRecord {
                code: "4901234567894".to_string(),
                name: "Widget".to_string(),
                price: "120".to_string(),
                category: "Tools".to_string(),
                note: "fragile".to_string(),
            }
        );
        assert_eq!(parsed.rows[1].note, "");
    }

    #[test]
    fn japanese_header_is_recognized() {
        let parsed = parse_master_csv("JAN,商品名\n12345678,鉛筆\n", CodePolicy::Any);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].name, "鉛筆");
    }

    #[test]
    fn headerless_payload_keeps_first_row() {
        let parsed = parse_master_csv("12345678,Barcode scanner\n", CodePolicy::Any);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].name, "Barcode scanner");
    }

    #[test]
    fn ragged_rows_default_to_empty() {
        let parsed = parse_master_csv("1111\n 2222 , Only name \n", CodePolicy::Any);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].name, "");
        assert_eq!(parsed.rows[1].name, "Only name");
        assert_eq!(parsed.rows[1].price, "");
        assert_eq!(parsed.rows[1].note, "");
    }

    #[test]
    fn quoted_fields_keep_commas_and_lose_quotes() {
        let payload = "\"1111\",\"Nuts, salted\",\"300\"\n";
        let parsed = parse_master_csv(payload, CodePolicy::Any);
        assert_eq!(parsed.rows[0].code, "1111");
        assert_eq!(parsed.rows[0].name, "Nuts, salted");
        assert_eq!(parsed.rows[0].price, "300");
    }

    #[test]
    fn empty_codes_are_counted_as_skipped() {
        let payload = "1111,A\n,No code\n  ,Blank\n2222,B\n";
        let parsed = parse_master_csv(payload, CodePolicy::Any);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn blank_lines_and_bom_are_ignored() {
        let payload = "\u{feff}code,name\n\n1111,A\n   \n\n2222,B\n";
        let parsed = parse_master_csv(payload, CodePolicy::Any);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn broken_quote_only_affects_its_line() {
        let payload = "1111,\"Unclosed\n2222,Fine\n";
        let parsed = parse_master_csv(payload, CodePolicy::Any);
        let codes: Vec<&str> = parsed.rows.iter().map(|r| r.code.as_str()).collect();
        assert!(codes.contains(&"2222"));
        assert_eq!(parsed.rows.len() + parsed.skipped, 2);
    }

    #[test]
    fn jan_policy_skips_bad_codes() {
        let payload = "4901234567894,Good\nABC,Bad\n123,Short\n";
        let parsed = parse_master_csv(payload, CodePolicy::Jan);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.skipped, 2);
    }

    #[tokio::test]
    async fn import_reports_counts_and_persists() {
        let (importer, repo) = importer(CodePolicy::Any);
        let report = importer
            .import_str("code,name\n1111,A\n,missing\n2222,B\n")
            .await
            .unwrap();
        assert_eq!(report, ImportReport { imported: 2, skipped: 1 });
        assert_eq!(repo.lookup("2222").await.unwrap().unwrap().name, "B");
    }

    #[tokio::test]
    async fn reimport_of_same_payload_is_idempotent() {
        let (importer, repo) = importer(CodePolicy::Any);
        let payload = "1111,A\n2222,B\n";
        assert_eq!(importer.import_str(payload).await.unwrap().imported, 2);
        assert_eq!(importer.import_str(payload).await.unwrap().imported, 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn import_of_only_bad_rows_writes_nothing() {
        let (importer, repo) = importer(CodePolicy::Any);
        let report = importer.import_str(",a\n,b\n").await.unwrap();
        assert_eq!(report, ImportReport { imported: 0, skipped: 2 });
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn import_file_reads_from_disk() {
        let (importer, repo) = importer(CodePolicy::Any);
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "code,name,price\n4901234567894,Widget,120\n").unwrap();

        let report = importer.import_file(file.path()).await.unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(repo.lookup("4901234567894").await.unwrap().unwrap().price, "120");
    }
}
