//! InventCount - stocktaking ledger CLI
//!
//! Registers counted stock, imports the product master and exports the count
//! list as CSV. All state lives in a local SQLite database.

use clap::{Parser, Subcommand};
use inventcount::store::default_db_path;
use inventcount::{
    AfterExport, EditDraft, EntryDraft, Feedback, Ledger, LedgerConfig, LedgerError, Preview,
    Registration, Result,
};
use std::path::PathBuf;

/// Stocktaking ledger - count, enrich and export inventory
#[derive(Parser, Debug)]
#[command(name = "inventcount")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file (default: <data dir>/inventcount/inventory.db)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// JSON settings file (unit table, validation policies, export format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a counted entry
    Add {
        /// Scanned or typed product code
        code: String,
        #[arg(short, long, default_value_t = 1, allow_hyphen_values = true)]
        quantity: i64,
        /// Unit label (default: the base unit)
        #[arg(short, long)]
        unit: Option<String>,
    },
    /// Show the master name hint for a code
    Preview { code: String },
    /// List every entry
    List {
        /// Print JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Change quantity and/or unit of an entry
    Edit {
        id: i64,
        #[arg(short, long, allow_hyphen_values = true)]
        quantity: Option<i64>,
        #[arg(short, long)]
        unit: Option<String>,
    },
    /// Delete one or more entries (several ids are removed all-or-nothing)
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<i64>,
    },
    /// Delete every entry (master records are kept)
    Clear {
        /// Confirm the irreversible deletion
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Import the product master from a CSV file
    ImportMaster { file: PathBuf },
    /// Show the master record for a code
    Lookup { code: String },
    /// Export all entries as CSV
    Export {
        /// Directory to write the file into
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Clear the inventory after a successful export
        #[arg(long, default_value_t = false)]
        purge: bool,
        /// Confirm --purge
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Show the configured unit table
    Units,
    /// Show entry and master record counts
    Status,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        if e.is_user_error() {
            eprintln!("{}", e);
            std::process::exit(2);
        }
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = LedgerConfig::load(args.config.as_deref())?;
    let db_path = args.database.unwrap_or_else(default_db_path);
    log::debug!("Database path: {}", db_path.display());

    let ledger = Ledger::open(&db_path, &config)?;

    match args.command {
        Command::Add {
            code,
            quantity,
            unit,
        } => {
            let draft = EntryDraft {
                code,
                quantity,
                unit,
            };
            let registration = ledger.registrar.register(draft).await?;
            print_registration("Registered", &registration);
        }
        Command::Preview { code } => match ledger.registrar.preview(&code).await? {
            Preview::Pending => println!("(code too short to look up)"),
            Preview::Found(name) => println!("{}", name),
            Preview::NotRegistered => println!("not in product master"),
        },
        Command::List { json } => {
            let entries = ledger.inventory.list_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (n, e) in entries.iter().enumerate() {
                    println!(
                        "{:>4}  #{:<6} {:<14} {:<24} {:>6} {:<4} {:>8}  {}",
                        n + 1,
                        e.id,
                        e.code,
                        e.product_name.as_deref().unwrap_or(""),
                        e.quantity,
                        e.unit,
                        e.derived_quantity,
                        e.recorded_at
                    );
                }
                println!("{} entries", entries.len());
            }
        }
        Command::Edit { id, quantity, unit } => {
            let registration = ledger
                .registrar
                .edit(id, EditDraft { quantity, unit })
                .await?;
            print_registration("Updated", &registration);
        }
        Command::Delete { ids } => {
            if let [id] = ids.as_slice() {
                ledger.inventory.delete(*id).await?;
                println!("Deleted entry {}", id);
            } else {
                let removed = ledger.inventory.delete_many(&ids).await?;
                println!("Deleted {} entries", removed);
            }
        }
        Command::Clear { yes } => {
            if !yes {
                return Err(LedgerError::Validation(
                    "clear removes every entry; re-run with --yes to confirm".to_string(),
                ));
            }
            let removed = ledger.inventory.clear_all().await?;
            println!("Deleted {} entries", removed);
        }
        Command::ImportMaster { file } => {
            let report = ledger.importer.import_file(&file).await?;
            println!(
                "Imported {} master records ({} skipped)",
                report.imported, report.skipped
            );
        }
        Command::Lookup { code } => match ledger.master.lookup(&code).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => println!("not in product master"),
        },
        Command::Export {
            out_dir,
            purge,
            yes,
        } => {
            let after = match (purge, yes) {
                (false, _) => AfterExport::Keep,
                (true, true) => AfterExport::Purge,
                (true, false) => {
                    return Err(LedgerError::Validation(
                        "--purge deletes every entry after export; add --yes to confirm"
                            .to_string(),
                    ))
                }
            };
            match ledger.exporter.export_to_dir(&out_dir, after).await {
                Ok(outcome) => {
                    println!("Exported {} entries to {}", outcome.rows, outcome.path.display());
                    if outcome.purged > 0 {
                        println!("Cleared {} entries", outcome.purged);
                    }
                }
                Err(LedgerError::NoData) => println!("Nothing to export"),
                Err(e) => return Err(e),
            }
        }
        Command::Units => {
            for (label, multiplier) in config.units.iter() {
                let base = if label == config.units.base_unit() {
                    " (base)"
                } else {
                    ""
                };
                println!("{} = {}{}", label, multiplier, base);
            }
        }
        Command::Status => {
            println!("Database: {}", db_path.display());
            println!("Entries: {}", ledger.inventory.count().await?);
            println!("Master records: {}", ledger.master.count().await?);
        }
    }

    Ok(())
}

fn print_registration(action: &str, registration: &Registration) {
    let entry = &registration.entry;
    println!(
        "{} #{}: {} x{} {} (= {})",
        action, entry.id, entry.code, entry.quantity, entry.unit, entry.derived_quantity
    );
    match &registration.feedback {
        Feedback::Found(name) => println!("  {}", name),
        Feedback::NotFound => println!("  not in product master"),
    }
}
