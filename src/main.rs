//! Bankrev CLI - load and inspect bank app-review data

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bankrev::storage::ReviewStore;
use bankrev::{Loader, config, ingest, output};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "bankrev")]
#[command(version = "0.1.0")]
#[command(about = "SQLite store and idempotent loader for bank app reviews")]
#[command(long_about = r#"
Bankrev persists processed mobile-banking reviews into a two-table schema
(banks, reviews) and keeps re-runs idempotent:
  • Banks are created once per distinct name
  • Re-loaded records are skipped or sentiment-updated, never duplicated
  • Bad records are rejected with reasons, the batch continues

Example usage:
  bankrev init
  bankrev load --input data/processed/sentiment_themes_analysis.csv
  bankrev stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides bankrev.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and write a bankrev.toml
    Init {
        /// Overwrite an existing bankrev.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Load a CSV batch of processed review records
    Load {
        /// Path to the CSV batch
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show database statistics and reporting breakdowns
    Stats {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List banks with their review counts
    Banks,

    /// Delete a bank and (by cascade) all of its reviews
    DeleteBank {
        /// Bank name as stored
        #[arg(short, long)]
        name: String,

        /// Actually delete; without this flag only reports what would go
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let db_path = resolve_database(cli.database)?;

    match cli.command {
        Commands::Init { force } => {
            config::ensure_db_dir(&db_path)?;
            let store = ReviewStore::open(&db_path)?;
            let stats = store.stats()?;

            let cfg = config::BankrevConfig {
                database: Some(db_path.display().to_string()),
            };
            config::write_config(&config::default_config_path(), &cfg, force)?;

            println!("🗄️  Database ready: {:?}", db_path);
            println!("📝 Config written: {:?}", config::default_config_path());
            println!("{}", stats);
        }

        Commands::Load { input, format } => {
            println!("📥 Loading batch: {:?}", input);
            println!("🗄️  Database: {:?}", db_path);

            let records = ingest::read_records(&input)?;
            println!("📄 Read {} records", records.len());

            config::ensure_db_dir(&db_path)?;
            let store = ReviewStore::open(&db_path)?;
            let summary = Loader::new(&store).load(&records);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                output::print_summary(&summary);
                println!("{}", store.stats()?);
            }
        }

        Commands::Stats { format } => {
            let store = ReviewStore::open(&db_path)?;
            let stats = store.stats()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("📊 Bankrev Statistics ({:?})", db_path);
                println!("------------------------------------");
                output::print_stats(&stats);
                println!("{}", output::ratings_table(&store.rating_distribution()?));
                println!();
                println!("{}", output::sentiment_table(&store.sentiment_breakdown()?));
            }
        }

        Commands::Banks => {
            let store = ReviewStore::open(&db_path)?;
            let banks = store.reviews_per_bank()?;
            if banks.is_empty() {
                println!("∅ No banks in the database yet.");
            } else {
                println!("{}", output::banks_table(&banks));
            }
        }

        Commands::DeleteBank { name, yes } => {
            let store = ReviewStore::open(&db_path)?;
            let bank = store
                .find_bank_by_name(&name)?
                .ok_or_else(|| anyhow::anyhow!("bank not found: {}", name))?;
            let review_count = store.count_reviews_for_bank(bank.bank_id)?;

            if !yes {
                println!(
                    "⚠️  Would delete bank '{}' and {} reviews. Re-run with --yes to confirm.",
                    bank.bank_name, review_count
                );
                return Ok(());
            }

            store.delete_bank(bank.bank_id)?;
            println!(
                "🗑️  Deleted bank '{}' and {} reviews (cascade).",
                bank.bank_name, review_count
            );
        }
    }

    Ok(())
}

/// Database path resolution: CLI flag, then bankrev.toml, then the default
fn resolve_database(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(cfg) = config::load_config(None)? {
        if let Some(db) = cfg.database {
            return Ok(PathBuf::from(db));
        }
    }
    Ok(config::default_database_path())
}
