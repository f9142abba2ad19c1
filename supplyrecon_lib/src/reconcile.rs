//! Idempotent merge of classified matches into configuration rows.
//!
//! Existing rows are bulk-loaded once into an index keyed by
//! `(insumo_catalogo_id, tipo_anestesia)`. Each eligible match then becomes an
//! insert (key absent), an update (any bound differs), or a no-op (identical).
//! Writes are flushed in fixed-size batches; a rejected batch is logged and
//! counted, and later batches still run.

use std::collections::HashMap;

use serde::Serialize;

use crate::classify::{ClassifiedMatch, SuggestedAction};
use crate::error::ReconError;
use crate::model::{ConfigKey, ConfigurationRow};
use crate::store::ConfigStore;

/// Rows per insert or update batch.
pub const WRITE_BATCH_SIZE: usize = 100;

/// Run-mode flags supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    /// Merge `review` matches as well as `merge` matches.
    pub include_medium: bool,
}

impl RunMode {
    pub fn high_only() -> Self {
        Self {
            include_medium: false,
        }
    }

    pub fn with_medium() -> Self {
        Self {
            include_medium: true,
        }
    }

    /// Whether a match of this action is written in this mode.
    pub fn merges(&self, action: SuggestedAction) -> bool {
        match action {
            SuggestedAction::Merge => true,
            SuggestedAction::Review => self.include_medium,
            SuggestedAction::Reject => false,
        }
    }
}

/// Existing configuration rows indexed by composite key.
#[derive(Debug, Default)]
pub struct ConfigIndex {
    rows: HashMap<ConfigKey, ConfigurationRow>,
}

impl ConfigIndex {
    pub fn from_rows(rows: Vec<ConfigurationRow>) -> Self {
        let rows = rows.into_iter().map(|row| (row.key(), row)).collect();
        Self { rows }
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&ConfigurationRow> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Writes decided for one run, before anything is flushed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergePlan {
    pub inserts: Vec<ConfigurationRow>,
    pub updates: Vec<ConfigurationRow>,
    pub unchanged: usize,
    /// Eligible matches dropped because a better match claimed the same key.
    pub duplicate_keys: usize,
    /// `review` matches left for a human because the mode excludes them.
    pub pending_review: usize,
}

impl MergePlan {
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }
}

/// Counts recorded after a plan is flushed.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed_batches: usize,
    pub failed_rows: usize,
    pub duplicate_keys: usize,
    pub pending_review: usize,
}

/// Decide insert / update / no-op for every eligible match.
///
/// When several eligible matches share a key, the highest score wins and
/// earlier matches win ties. Updates overwrite all three bound values.
pub fn plan_merge(matches: &[ClassifiedMatch], existing: &ConfigIndex, mode: RunMode) -> MergePlan {
    let mut plan = MergePlan::default();
    let mut chosen: Vec<&ClassifiedMatch> = Vec::new();
    let mut slots: HashMap<ConfigKey, usize> = HashMap::new();

    for m in matches {
        if !mode.merges(m.action) {
            if m.action == SuggestedAction::Review {
                plan.pending_review += 1;
            }
            continue;
        }

        let key = ConfigKey::new(&m.candidate.catalog_item_id, &m.candidate.procedure_tag);
        match slots.get(&key) {
            Some(&slot) => {
                plan.duplicate_keys += 1;
                let current = chosen[slot];
                tracing::warn!(
                    "Legacy entries {} and {} both map to ({}, {}); keeping the higher score",
                    current.candidate.legacy_id,
                    m.candidate.legacy_id,
                    key.catalog_item_id,
                    key.procedure_tag
                );
                if m.score() > current.score() {
                    chosen[slot] = m;
                }
            }
            None => {
                slots.insert(key, chosen.len());
                chosen.push(m);
            }
        }
    }

    for m in chosen {
        let key = ConfigKey::new(&m.candidate.catalog_item_id, &m.candidate.procedure_tag);
        let desired = ConfigurationRow::new(&key, m.candidate.bounds);
        match existing.get(&key) {
            None => plan.inserts.push(desired),
            Some(row) if row.bounds() != desired.bounds() => plan.updates.push(desired),
            Some(_) => plan.unchanged += 1,
        }
    }

    plan
}

/// Flush a plan in batches of [`WRITE_BATCH_SIZE`].
pub fn apply_plan<S: ConfigStore + ?Sized>(store: &mut S, plan: MergePlan) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        unchanged: plan.unchanged,
        duplicate_keys: plan.duplicate_keys,
        pending_review: plan.pending_review,
        ..MergeOutcome::default()
    };

    for (i, batch) in plan.inserts.chunks(WRITE_BATCH_SIZE).enumerate() {
        match store.insert_configuration(batch) {
            Ok(n) => outcome.inserted += n,
            Err(e) => {
                tracing::error!(
                    "Insert batch {} ({} rows) failed: {}",
                    i + 1,
                    batch.len(),
                    e
                );
                outcome.failed_batches += 1;
                outcome.failed_rows += batch.len();
            }
        }
    }

    for (i, batch) in plan.updates.chunks(WRITE_BATCH_SIZE).enumerate() {
        match store.update_configuration(batch) {
            Ok(n) => outcome.updated += n,
            Err(e) => {
                tracing::error!(
                    "Update batch {} ({} rows) failed: {}",
                    i + 1,
                    batch.len(),
                    e
                );
                outcome.failed_batches += 1;
                outcome.failed_rows += batch.len();
            }
        }
    }

    outcome
}

/// Load the existing-row index, plan, and flush.
///
/// Fails before any write if the existing rows cannot be read.
pub fn reconcile<S: ConfigStore + ?Sized>(
    store: &mut S,
    matches: &[ClassifiedMatch],
    mode: RunMode,
) -> Result<MergeOutcome, ReconError> {
    let existing = store
        .load_configuration()
        .map_err(ReconError::ConfigurationUnavailable)?;
    let index = ConfigIndex::from_rows(existing);
    tracing::debug!("Loaded {} existing configuration rows", index.len());

    let plan = plan_merge(matches, &index, mode);
    Ok(apply_plan(store, plan))
}
