use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use supplyrecon_lib::response::truncate_score;
use supplyrecon_lib::{ClassifiedMatch, DiagnosticReport, LegacyEntry, RunSummary};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => OutputFormat::Json,
            "markdown" | "md" => OutputFormat::Markdown,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
struct StatRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: usize,
}

#[derive(Tabled, Serialize)]
struct MatchRow {
    #[tabled(rename = "Legacy ID")]
    #[serde(rename = "Legacy ID")]
    legacy_id: String,
    #[tabled(rename = "Legacy Name")]
    #[serde(rename = "Legacy Name")]
    legacy_name: String,
    #[tabled(rename = "Catalog ID")]
    #[serde(rename = "Catalog ID")]
    catalog_id: String,
    #[tabled(rename = "Catalog Name")]
    #[serde(rename = "Catalog Name")]
    catalog_name: String,
    #[tabled(rename = "Procedure")]
    #[serde(rename = "Procedure")]
    procedure: String,
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    score: String,
    #[tabled(rename = "Tier")]
    #[serde(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Action")]
    #[serde(rename = "Action")]
    action: String,
}

#[derive(Tabled, Serialize)]
struct UnmatchedRow {
    #[tabled(rename = "Legacy ID")]
    #[serde(rename = "Legacy ID")]
    legacy_id: String,
    #[tabled(rename = "Legacy Name")]
    #[serde(rename = "Legacy Name")]
    legacy_name: String,
    #[tabled(rename = "Procedure")]
    #[serde(rename = "Procedure")]
    procedure: String,
}

// -- Row builders --

fn build_stat_rows(summary: &RunSummary) -> Vec<StatRow> {
    let merge = &summary.merge;
    vec![
        StatRow { metric: "Legacy entries", value: summary.total_entries },
        StatRow { metric: "Matches", value: summary.total_matches },
        StatRow { metric: "  high", value: summary.tiers.high },
        StatRow { metric: "  medium", value: summary.tiers.medium },
        StatRow { metric: "  low", value: summary.tiers.low },
        StatRow { metric: "Unmatched", value: summary.unmatched },
        StatRow { metric: "Rows inserted", value: merge.inserted },
        StatRow { metric: "Rows updated", value: merge.updated },
        StatRow { metric: "Rows unchanged", value: merge.unchanged },
        StatRow { metric: "Pending review", value: merge.pending_review },
        StatRow { metric: "Duplicate keys", value: merge.duplicate_keys },
        StatRow { metric: "Failed batches", value: merge.failed_batches },
        StatRow { metric: "Failed rows", value: merge.failed_rows },
    ]
}

fn build_match_rows(matches: &[ClassifiedMatch]) -> Vec<MatchRow> {
    matches
        .iter()
        .map(|m| MatchRow {
            legacy_id: m.candidate.legacy_id.clone(),
            legacy_name: m.candidate.legacy_name.clone(),
            catalog_id: m.candidate.catalog_item_id.clone(),
            catalog_name: m.candidate.catalog_name.clone(),
            procedure: m.candidate.procedure_tag.clone(),
            score: format!("{:.4}", truncate_score(m.score())),
            tier: m.tier.label().to_string(),
            action: m.action.label().to_string(),
        })
        .collect()
}

fn build_unmatched_rows(entries: &[LegacyEntry]) -> Vec<UnmatchedRow> {
    entries
        .iter()
        .map(|e| UnmatchedRow {
            legacy_id: e.id.clone(),
            legacy_name: e.nombre_insumo.clone(),
            procedure: e.tipo_anestesia.clone(),
        })
        .collect()
}

fn render<T: Tabled>(rows: Vec<T>, format: &OutputFormat) -> String {
    let mut table = Table::new(rows);
    if *format == OutputFormat::Markdown {
        table.with(Style::markdown());
    }
    table.to_string()
}

// -- Table / Markdown output --

pub fn print_summary_table(summary: &RunSummary, format: &OutputFormat) {
    println!("{}", render(build_stat_rows(summary), format));
    if !summary.sample_matches.is_empty() {
        println!("\nSample matches:");
        println!("{}", render(build_match_rows(&summary.sample_matches), format));
    }
    if !summary.sample_unmatched.is_empty() {
        println!("\nSample unmatched entries:");
        println!("{}", render(build_unmatched_rows(&summary.sample_unmatched), format));
    }
}

pub fn print_diagnostic_table(report: &DiagnosticReport, format: &OutputFormat) {
    println!("{}", render(build_match_rows(&report.matches), format));
    if !report.unmatched.is_empty() {
        println!("\nUnmatched entries:");
        println!("{}", render(build_unmatched_rows(&report.unmatched), format));
    }
}

// -- CSV output --

/// Neutralize spreadsheet formula injection in a CSV cell.
pub fn sanitize_csv_field(value: &str) -> String {
    if value.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        format!("'{}", value)
    } else {
        value.to_string()
    }
}

pub fn write_diagnostic_csv(report: &DiagnosticReport, path: &Path) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path)?;
    let rows = build_match_rows(&report.matches);
    let count = rows.len();
    for mut row in rows {
        row.legacy_name = sanitize_csv_field(&row.legacy_name);
        row.catalog_name = sanitize_csv_field(&row.catalog_name);
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(count)
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}
