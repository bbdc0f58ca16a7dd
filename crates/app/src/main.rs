use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ledgerlens_core::TransactionRecord;
use ledgerlens_engine::{
    detect_anomalies, find_duplicates, find_recurring, learn_rules, review_queue, run_pipeline,
    trusted_training_set, KeywordTable, DEFAULT_ANOMALY_THRESHOLD, DEFAULT_MIN_EXAMPLES,
    DEFAULT_MIN_OCCURRENCES, DEFAULT_MIN_PRECISION, DEFAULT_REVIEW_CONFIDENCE,
};
use ledgerlens_store::RuleStore;

/// Transaction intelligence over canonical bank-statement records.
#[derive(Parser)]
#[command(name = "ledgerlens", version, about)]
struct Cli {
    /// Canonical records document (JSON array of TransactionRecord).
    #[arg(long, global = true, default_value = "records.json")]
    records: PathBuf,
    /// Rule store document.
    #[arg(long, global = true, default_value = "rules.json")]
    store: PathBuf,
    /// Keyword table (TOML); built-in table when omitted.
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full labeling pass and write the labeled records.
    Classify {
        /// Output path; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List duplicate clusters.
    Duplicates,
    /// List statistically unusual outflows.
    Anomalies {
        #[arg(long, default_value_t = DEFAULT_ANOMALY_THRESHOLD)]
        threshold: f64,
    },
    /// List merchants with a monthly-like cadence.
    Recurring {
        #[arg(long, default_value_t = DEFAULT_MIN_OCCURRENCES)]
        min_occurrences: usize,
    },
    /// Mine pattern rules from trusted labels and merge them into the store.
    Learn {
        #[arg(long, default_value_t = DEFAULT_MIN_EXAMPLES)]
        min_examples: usize,
        #[arg(long, default_value_t = DEFAULT_MIN_PRECISION)]
        min_precision: f64,
        /// Also trust very-high-confidence auto labels, not just overrides.
        #[arg(long)]
        include_auto: bool,
    },
    /// List records that deserve manual review.
    Review {
        #[arg(long, default_value_t = DEFAULT_REVIEW_CONFIDENCE)]
        min_confidence: f64,
    },
    /// Record a manual category correction for one record id.
    Override {
        #[arg(long)]
        id: String,
        #[arg(long)]
        category: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let store = RuleStore::load(&cli.store)
        .with_context(|| format!("loading rule store {}", cli.store.display()))?;
    let table = match &cli.keywords {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading keyword table {}", path.display()))?;
            KeywordTable::from_toml(&raw)
                .with_context(|| format!("parsing keyword table {}", path.display()))?
        }
        None => KeywordTable::default(),
    };

    match cli.command {
        Command::Classify { out } => {
            let records = load_records(&cli.records)?;
            let labeled = run_pipeline(records, &table, &store);
            let doc = serde_json::to_string_pretty(&labeled)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, doc)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("wrote {} labeled records to {}", labeled.len(), path.display());
                }
                None => println!("{doc}"),
            }
        }
        Command::Duplicates => {
            let records = labeled(&cli, &table, &store)?;
            for cluster in find_duplicates(&records) {
                println!(
                    "{} | {} | debit {} credit {}: {}",
                    cluster.key.merchant,
                    cluster.key.currency,
                    cluster.key.debit,
                    cluster.key.credit,
                    cluster.record_ids.join(", ")
                );
            }
        }
        Command::Anomalies { threshold } => {
            let records = labeled(&cli, &table, &store)?;
            for flag in detect_anomalies(&records, threshold) {
                println!(
                    "{} | {} | {} | {} — {}",
                    flag.record_id, flag.merchant, flag.category, flag.amount, flag.reason
                );
            }
        }
        Command::Recurring { min_occurrences } => {
            let records = labeled(&cli, &table, &store)?;
            for hit in find_recurring(&records, min_occurrences) {
                println!(
                    "{} | every ~{:.0} days | {} seen | avg spend {} | next ~{} | confidence {:.2}",
                    hit.merchant,
                    hit.cadence_days,
                    hit.occurrences,
                    hit.avg_spend,
                    hit.expected_next,
                    hit.confidence
                );
            }
        }
        Command::Learn { min_examples, min_precision, include_auto } => {
            let records = labeled(&cli, &table, &store)?;
            let training: Vec<_> = trusted_training_set(&records, include_auto)
                .into_iter()
                .cloned()
                .collect();
            let rules = learn_rules(&training, min_examples, min_precision);
            let mut store = store;
            let merged = store.merge_pattern_rules(
                rules
                    .iter()
                    .map(|r| (r.token.clone(), r.category.name().to_string())),
            );
            store.save(&cli.store)?;
            println!(
                "learned {} rules from {} trusted records ({} merged into {})",
                rules.len(),
                training.len(),
                merged,
                cli.store.display()
            );
            for rule in rules {
                println!(
                    "  {} -> {} ({} examples, precision {:.2})",
                    rule.token, rule.category, rule.occurrences, rule.precision
                );
            }
        }
        Command::Review { min_confidence } => {
            let records = labeled(&cli, &table, &store)?;
            for rec in review_queue(&records, min_confidence) {
                println!(
                    "{} | {} | {} | {:.2}{}",
                    rec.id,
                    rec.merchant_key(),
                    rec.category,
                    rec.category_confidence,
                    if rec.is_transfer { " | transfer" } else { "" }
                );
            }
        }
        Command::Override { id, category } => {
            let mut store = store;
            store.set_override(&id, &category);
            store.save(&cli.store)?;
            println!("override recorded: {id} -> {category}");
        }
    }
    Ok(())
}

fn load_records(path: &PathBuf) -> Result<Vec<TransactionRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading records {}", path.display()))?;
    let records: Vec<TransactionRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing records {}", path.display()))?;
    tracing::debug!(records = records.len(), path = %path.display(), "records loaded");
    Ok(records)
}

/// Load and run the labeling pass; the detectors operate on labeled records.
fn labeled(cli: &Cli, table: &KeywordTable, store: &RuleStore) -> Result<Vec<TransactionRecord>> {
    Ok(run_pipeline(load_records(&cli.records)?, table, store))
}
