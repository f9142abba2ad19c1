//! The `import` subcommand: load legacy and catalog spreadsheets (CSV) into the store.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use csv::Reader;
use serde::Deserialize;
use supplyrecon_lib::{CatalogItem, Db, LegacyEntry, ReconConfig};

use super::resolve_db_path;

/// Arguments for the `import` subcommand.
#[derive(Args)]
pub struct ImportArgs {
    /// SQLite database path (overrides config and SUPPLYRECON_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub action: ImportAction,
}

#[derive(Subcommand)]
pub enum ImportAction {
    /// Import the legacy supply list (id,nombre_insumo,tipo_anestesia,min_excel,max_excel)
    Legacy(FileArgs),
    /// Import the canonical catalog (id,nombre,activo)
    Catalog(FileArgs),
}

#[derive(Args)]
pub struct FileArgs {
    /// Input CSV file path
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Dry run: parse and report without writing to DB
    #[arg(long)]
    pub dry_run: bool,
}

/// CSV row of the legacy spreadsheet. Bound cells are kept as text so blanks survive.
#[derive(Deserialize)]
struct LegacyRecord {
    id: String,
    nombre_insumo: String,
    tipo_anestesia: String,
    #[serde(default)]
    min_excel: Option<String>,
    #[serde(default)]
    max_excel: Option<String>,
}

#[derive(Deserialize)]
struct CatalogRecord {
    id: String,
    nombre: String,
    #[serde(default)]
    activo: Option<String>,
}

pub fn run(args: &ImportArgs, config: &ReconConfig) -> Result<()> {
    let db_path = resolve_db_path(args.db.as_deref(), config);

    match &args.action {
        ImportAction::Legacy(file) => {
            let (entries, skipped) = read_legacy(&file.input)?;
            if file.dry_run {
                eprintln!(
                    "DRY RUN: Would import {} legacy entries. Skipped {} (missing id or name).",
                    entries.len(),
                    skipped
                );
                return Ok(());
            }
            let mut db = Db::open(&db_path)?;
            db.init()?;
            let count = db.upsert_legacy_entries(&entries)?;
            eprintln!(
                "Imported {} legacy entries into {}. Skipped {} (missing id or name).",
                count,
                db_path.display(),
                skipped
            );
        }
        ImportAction::Catalog(file) => {
            let (items, skipped) = read_catalog(&file.input)?;
            if file.dry_run {
                eprintln!(
                    "DRY RUN: Would import {} catalog items ({} active). Skipped {}.",
                    items.len(),
                    items.iter().filter(|i| i.activo).count(),
                    skipped
                );
                return Ok(());
            }
            let mut db = Db::open(&db_path)?;
            db.init()?;
            let count = db.upsert_catalog_items(&items)?;
            eprintln!(
                "Imported {} catalog items into {}. Skipped {} (missing id or name).",
                count,
                db_path.display(),
                skipped
            );
        }
    }

    Ok(())
}

fn read_legacy(path: &Path) -> Result<(Vec<LegacyEntry>, usize)> {
    let mut rdr = Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut entries = Vec::new();
    let mut skipped = 0;

    for (i, result) in rdr.deserialize::<LegacyRecord>().enumerate() {
        // Header is line 1
        let line = i + 2;
        let record = result.with_context(|| format!("line {}: malformed legacy row", line))?;
        let id = record.id.trim();
        if id.is_empty() || record.nombre_insumo.trim().is_empty() {
            skipped += 1;
            continue;
        }
        entries.push(LegacyEntry {
            id: id.to_string(),
            nombre_insumo: record.nombre_insumo,
            tipo_anestesia: record.tipo_anestesia.trim().to_string(),
            min_excel: parse_quantity(record.min_excel.as_deref(), line, "min_excel")?,
            max_excel: parse_quantity(record.max_excel.as_deref(), line, "max_excel")?,
        });
    }

    Ok((entries, skipped))
}

fn read_catalog(path: &Path) -> Result<(Vec<CatalogItem>, usize)> {
    let mut rdr = Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut items = Vec::new();
    let mut skipped = 0;

    for (i, result) in rdr.deserialize::<CatalogRecord>().enumerate() {
        let line = i + 2;
        let record = result.with_context(|| format!("line {}: malformed catalog row", line))?;
        let id = record.id.trim();
        if id.is_empty() || record.nombre.trim().is_empty() {
            skipped += 1;
            continue;
        }
        items.push(CatalogItem {
            id: id.to_string(),
            nombre: record.nombre,
            activo: parse_flag(record.activo.as_deref(), line)?,
        });
    }

    Ok((items, skipped))
}

/// Parse a spreadsheet quantity cell. Blank is `None`.
///
/// Accepts digits, optionally followed by `.` or `,` and one or two zeros
/// (`2.0`, `2,00`). Three-digit fractions like `1.000` read as thousands in
/// es-MX exports and are rejected rather than guessed.
fn parse_quantity(cell: Option<&str>, line: usize, column: &str) -> Result<Option<i64>> {
    let Some(raw) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let digits = match raw.split_once(['.', ',']) {
        Some((whole, zeros))
            if (1..=2).contains(&zeros.len()) && zeros.bytes().all(|b| b == b'0') =>
        {
            whole
        }
        Some(_) => bail!(
            "line {}: {} must be a whole number (no thousands separators), got {:?}",
            line,
            column,
            raw
        ),
        None => raw,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("line {}: {} must be a whole number, got {:?}", line, column, raw);
    }
    let value = digits
        .parse::<i64>()
        .with_context(|| format!("line {}: {} is out of range: {:?}", line, column, raw))?;
    Ok(Some(value))
}

/// Parse the `activo` cell. A missing column or blank cell means active.
fn parse_flag(cell: Option<&str>, line: usize) -> Result<bool> {
    let raw = cell.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    match raw.as_str() {
        "" | "1" | "true" | "t" | "si" | "sí" | "yes" | "y" | "x" => Ok(true),
        "0" | "false" | "f" | "no" | "n" => Ok(false),
        _ => bail!("line {}: activo must be a boolean, got {:?}", line, raw),
    }
}
