//! The `diagnose` subcommand: list matches down to the diagnostic floor without writing.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use supplyrecon_lib::{Db, Engine, ReconConfig};

use super::resolve_db_path;
use crate::output::{print_diagnostic_table, print_json, write_diagnostic_csv, OutputFormat};

/// Arguments for the `diagnose` subcommand.
#[derive(Args)]
pub struct DiagnoseArgs {
    /// SQLite database path (overrides config and SUPPLYRECON_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Also export the matches to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(args: &DiagnoseArgs, config: &ReconConfig, format: &OutputFormat) -> Result<()> {
    let db_path = resolve_db_path(args.db.as_deref(), config);
    let db = Db::open(&db_path)?;
    db.init()?;

    let report = Engine::new(db).diagnose()?;

    match format {
        OutputFormat::Json => print_json(&report),
        _ => {
            print_diagnostic_table(&report, format);
            eprintln!(
                "{} matches at or above {:.2} ({} high, {} medium, {} low), {} unmatched",
                report.matches.len(),
                report.floor,
                report.tiers.high,
                report.tiers.medium,
                report.tiers.low,
                report.unmatched.len()
            );
        }
    }

    if let Some(path) = &args.csv {
        let written = write_diagnostic_csv(&report, path)?;
        eprintln!("Wrote {} rows to {}", written, path.display());
    }

    Ok(())
}
