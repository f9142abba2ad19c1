mod commands;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use supplyrecon_lib::ReconConfig;

use crate::output::OutputFormat;

const DEFAULT_CONFIG_FILE: &str = "supplyrecon.toml";

#[derive(Parser)]
#[command(name = "supplyrecon")]
#[command(about = "Reconcile a legacy supply list against the canonical supply catalog")]
struct Cli {
    /// Output format: table, json, or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Config file (TOML). Falls back to SUPPLYRECON_CONFIG, then ./supplyrecon.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load legacy or catalog CSV exports into the store
    Import(commands::import::ImportArgs),
    /// Match legacy entries to the catalog and merge configuration rows
    Reconcile(commands::reconcile::ReconcileArgs),
    /// List matches down to the diagnostic floor without writing
    Diagnose(commands::diagnose::DiagnoseArgs),
    /// Serve reconciliation runs over HTTP
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("supplyrecon=info".parse()?)
                .add_directive("supplyrecon_lib=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output);
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Import(args) => commands::import::run(args, &config)?,
        Commands::Reconcile(args) => commands::reconcile::run(args, &config, &format)?,
        Commands::Diagnose(args) => commands::diagnose::run(args, &config, &format)?,
        Commands::Serve(args) => commands::serve::run(args, &config).await?,
    }

    Ok(())
}

/// Resolve configuration: explicit flag, then SUPPLYRECON_CONFIG, then
/// ./supplyrecon.toml if present, then defaults. SUPPLYRECON_DB overrides
/// the store path from any of those.
fn load_config(flag: Option<&Path>) -> Result<ReconConfig> {
    let explicit = flag
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("SUPPLYRECON_CONFIG").map(PathBuf::from));

    let mut config = match explicit {
        Some(path) => ReconConfig::from_path(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            ReconConfig::from_path(DEFAULT_CONFIG_FILE)?
        }
        None => ReconConfig::default(),
    };

    if let Some(db) = std::env::var_os("SUPPLYRECON_DB") {
        config.store.path = PathBuf::from(db);
    }
    config.validate()?;
    Ok(config)
}
