//! The `reconcile` subcommand: one full matching and merge run against the store.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use supplyrecon_lib::{Db, Engine, ReconConfig, ReconResponse, RunMode};

use super::resolve_db_path;
use crate::output::{print_json, print_summary_table, OutputFormat};

/// Arguments for the `reconcile` subcommand.
#[derive(Args)]
pub struct ReconcileArgs {
    /// SQLite database path (overrides config and SUPPLYRECON_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Also merge medium-confidence matches (0.70 to 0.90)
    #[arg(long)]
    pub include_medium: bool,
}

pub fn run(args: &ReconcileArgs, config: &ReconConfig, format: &OutputFormat) -> Result<()> {
    let db_path = resolve_db_path(args.db.as_deref(), config);
    let db = Db::open(&db_path)?;
    db.init()?;

    let mode = if args.include_medium || config.run.include_medium {
        RunMode::with_medium()
    } else {
        RunMode::high_only()
    };

    let engine = Engine::new(db).with_sample_size(config.run.sample_size);
    match engine.run(mode) {
        Ok(summary) => {
            match format {
                OutputFormat::Json => print_json(&ReconResponse::from_summary(&summary)),
                _ => print_summary_table(&summary, format),
            }
            if summary.merge.failed_batches > 0 {
                eprintln!(
                    "Warning: {} write batch(es) failed ({} rows). Re-run to retry them.",
                    summary.merge.failed_batches, summary.merge.failed_rows
                );
            }
            Ok(())
        }
        Err(e) => {
            if *format == OutputFormat::Json {
                print_json(&ReconResponse::failure(e.to_string()));
            }
            Err(e.into())
        }
    }
}
