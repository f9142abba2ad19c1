//! Run summaries assembled from matching and merge results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::{ClassifiedMatch, TierCounts};
use crate::matching::EntryMatches;
use crate::model::LegacyEntry;
use crate::reconcile::{MergeOutcome, RunMode};

/// Number of matches and unmatched entries sampled for display.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

/// Aggregate of one reconciliation run.
#[derive(Serialize, Debug, Clone)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub include_medium: bool,
    pub total_entries: usize,
    pub total_matches: usize,
    pub tiers: TierCounts,
    pub unmatched: usize,
    pub merge: MergeOutcome,
    pub sample_matches: Vec<ClassifiedMatch>,
    pub sample_unmatched: Vec<LegacyEntry>,
}

/// Build the summary for one run. Pure: no I/O.
pub fn summarize(
    results: &[EntryMatches],
    merge: MergeOutcome,
    mode: RunMode,
    sample_size: usize,
) -> RunSummary {
    let all_matches = results.iter().flat_map(|r| r.matches.iter());
    let tiers = TierCounts::tally(all_matches.clone());

    let sample_matches: Vec<ClassifiedMatch> = all_matches.take(sample_size).cloned().collect();
    let unmatched: Vec<&LegacyEntry> = results
        .iter()
        .filter(|r| r.is_unmatched())
        .map(|r| &r.entry)
        .collect();

    RunSummary {
        generated_at: Utc::now(),
        include_medium: mode.include_medium,
        total_entries: results.len(),
        total_matches: tiers.total(),
        tiers,
        unmatched: unmatched.len(),
        merge,
        sample_matches,
        sample_unmatched: unmatched.into_iter().take(sample_size).cloned().collect(),
    }
}

/// Read-only report of every classified match, including low-tier ones.
#[derive(Serialize, Debug, Clone)]
pub struct DiagnosticReport {
    pub generated_at: DateTime<Utc>,
    pub floor: f64,
    pub total_entries: usize,
    pub tiers: TierCounts,
    pub matches: Vec<ClassifiedMatch>,
    pub unmatched: Vec<LegacyEntry>,
}

pub fn diagnostic_report(results: Vec<EntryMatches>, floor: f64) -> DiagnosticReport {
    let total_entries = results.len();
    let mut matches = Vec::new();
    let mut unmatched = Vec::new();
    for result in results {
        if result.is_unmatched() {
            unmatched.push(result.entry);
        } else {
            matches.extend(result.matches);
        }
    }

    DiagnosticReport {
        generated_at: Utc::now(),
        floor,
        total_entries,
        tiers: TierCounts::tally(&matches),
        matches,
        unmatched,
    }
}
