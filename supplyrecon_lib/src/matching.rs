//! Candidate generation and selection for legacy supply names.
//!
//! For each legacy entry the active catalog is scanned with a containment
//! pre-filter (one normalized name must contain the other), the survivors are
//! scored, everything below the floor is discarded, and the best score plus all
//! near-ties within the tie band are kept. Keeping near-ties is what lets one
//! legacy name map onto a family of catalog variants.

use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{classify, ClassifiedMatch};
use crate::model::{Bounds, CatalogItem, LegacyEntry};
use crate::normalize::normalize;
use crate::similarity::similarity;

/// Minimum similarity for a candidate to be proposed at all.
pub const MATCH_FLOOR: f64 = 0.88;
/// Width of the near-tie band below the best score.
pub const TIE_BAND: f64 = 0.05;
/// Floor used by the diagnostic report, low enough to surface weak matches.
pub const DIAGNOSTIC_FLOOR: f64 = 0.60;

/// Absorbs float error when comparing a score against `best - TIE_BAND`.
const SCORE_EPSILON: f64 = 1e-9;

/// Selection thresholds for one run.
///
/// Only the predefined policies can be constructed, so thresholds cannot be
/// supplied as arbitrary user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    floor: f64,
    tie_band: f64,
}

impl MatchPolicy {
    /// Policy used by reconciliation runs.
    pub const STANDARD: MatchPolicy = MatchPolicy {
        floor: MATCH_FLOOR,
        tie_band: TIE_BAND,
    };

    /// Lower-floor policy for the read-only diagnostic report.
    pub const DIAGNOSTIC: MatchPolicy = MatchPolicy {
        floor: DIAGNOSTIC_FLOOR,
        tie_band: TIE_BAND,
    };

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn tie_band(&self) -> f64 {
        self.tie_band
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// A scored pairing between one legacy entry and one catalog item.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Candidate {
    pub legacy_id: String,
    pub legacy_name: String,
    pub procedure_tag: String,
    pub catalog_item_id: String,
    pub catalog_name: String,
    pub score: f64,
    /// Bounds inherited from the legacy entry.
    pub bounds: Bounds,
}

struct IndexedItem {
    id: String,
    name: String,
    normalized: String,
}

/// Active catalog items with their names normalized once per run.
pub struct CatalogIndex {
    items: Vec<IndexedItem>,
}

impl CatalogIndex {
    /// Build the index from raw catalog rows.
    ///
    /// Inactive items and items whose name normalizes to empty are left out.
    /// Items are ordered by id so candidate order does not depend on input order.
    pub fn build(catalog: &[CatalogItem]) -> Self {
        let mut items: Vec<IndexedItem> = catalog
            .iter()
            .filter(|item| item.activo)
            .filter_map(|item| {
                let normalized = normalize(&item.nombre);
                if normalized.is_empty() {
                    tracing::debug!("Catalog item {} has an empty normalized name", item.id);
                    return None;
                }
                Some(IndexedItem {
                    id: item.id.clone(),
                    name: item.nombre.clone(),
                    normalized,
                })
            })
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Score every catalog item related to `entry` by containment.
///
/// No floor is applied here; see [`select_candidates`].
pub fn generate_candidates(entry: &LegacyEntry, index: &CatalogIndex) -> Vec<Candidate> {
    let name = normalize(&entry.nombre_insumo);
    if name.is_empty() {
        return Vec::new();
    }

    let bounds = entry.bounds();
    index
        .items
        .iter()
        .filter(|item| item.normalized.contains(&name) || name.contains(&item.normalized))
        .map(|item| Candidate {
            legacy_id: entry.id.clone(),
            legacy_name: entry.nombre_insumo.clone(),
            procedure_tag: entry.procedure_tag().to_string(),
            catalog_item_id: item.id.clone(),
            catalog_name: item.name.clone(),
            score: similarity(&name, &item.normalized),
            bounds,
        })
        .collect()
}

/// Keep the best candidate and every candidate within the tie band of it.
///
/// Candidates below the policy floor are dropped first. The result is sorted by
/// score descending, then catalog id ascending. Empty when nothing clears the floor.
pub fn select_candidates(mut candidates: Vec<Candidate>, policy: &MatchPolicy) -> Vec<Candidate> {
    candidates.retain(|c| c.score >= policy.floor);
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.catalog_item_id.cmp(&b.catalog_item_id))
    });

    let Some(best) = candidates.first().map(|c| c.score) else {
        return candidates;
    };
    candidates.retain(|c| best - c.score <= policy.tie_band + SCORE_EPSILON);
    candidates
}

/// Classified matches for one legacy entry. Empty `matches` means unmatched.
#[derive(Debug, Clone)]
pub struct EntryMatches {
    pub entry: LegacyEntry,
    pub matches: Vec<ClassifiedMatch>,
}

impl EntryMatches {
    pub fn is_unmatched(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Generate, select, and classify candidates for one legacy entry.
pub fn match_entry(entry: &LegacyEntry, index: &CatalogIndex, policy: &MatchPolicy) -> EntryMatches {
    let selected = select_candidates(generate_candidates(entry, index), policy);
    EntryMatches {
        entry: entry.clone(),
        matches: selected.into_iter().map(classify).collect(),
    }
}

/// Match every legacy entry, in parallel. Output order equals input order.
pub fn match_entries(
    entries: &[LegacyEntry],
    index: &CatalogIndex,
    policy: &MatchPolicy,
) -> Vec<EntryMatches> {
    entries
        .par_iter()
        .map(|entry| match_entry(entry, index, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Tier;

    fn legacy(id: &str, name: &str) -> LegacyEntry {
        LegacyEntry {
            id: id.to_string(),
            nombre_insumo: name.to_string(),
            tipo_anestesia: "GENERAL".to_string(),
            min_excel: Some(1),
            max_excel: Some(3),
        }
    }

    fn item(id: &str, name: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            nombre: name.to_string(),
            activo: true,
        }
    }

    fn scored(id: &str, score: f64) -> Candidate {
        Candidate {
            legacy_id: "L1".to_string(),
            legacy_name: "X".to_string(),
            procedure_tag: "GENERAL".to_string(),
            catalog_item_id: id.to_string(),
            catalog_name: id.to_string(),
            score,
            bounds: Bounds { min: 1, max: 3, default: 1 },
        }
    }

    fn circuit_catalog() -> Vec<CatalogItem> {
        vec![
            item("C1", "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (ADULTO)"),
            item("C2", "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (NEONATAL)"),
            item("C3", "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (PEDIÁTRICO)"),
            item("C4", "CANULA NASAL ADULTO"),
        ]
    }

    #[test]
    fn test_index_skips_inactive_and_empty() {
        let catalog = vec![
            item("A", "GASA"),
            CatalogItem {
                id: "B".to_string(),
                nombre: "GASA ESTERIL".to_string(),
                activo: false,
            },
            item("C", " -- "),
        ];
        let index = CatalogIndex::build(&catalog);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_prefilter_requires_containment() {
        let index = CatalogIndex::build(&[
            item("A", "GASA ESTERIL"),
            item("B", "GUANTE ESTERIL"),
        ]);
        let candidates = generate_candidates(&legacy("L1", "gasa"), &index);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].catalog_item_id, "A");
    }

    #[test]
    fn test_prefilter_accepts_reverse_containment() {
        let index = CatalogIndex::build(&[item("A", "Jeringa 10 ml")]);
        let candidates = generate_candidates(&legacy("L1", "JERINGA 10 ML DESECHABLE"), &index);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_empty_legacy_name_has_no_candidates() {
        let index = CatalogIndex::build(&circuit_catalog());
        assert!(generate_candidates(&legacy("L1", " (.) "), &index).is_empty());
    }

    #[test]
    fn test_candidates_carry_bounds_and_tag() {
        let index = CatalogIndex::build(&[item("A", "GASA ESTERIL")]);
        let mut entry = legacy("L1", "GASA ESTERIL");
        entry.tipo_anestesia = "  REGIONAL ".to_string();
        let candidates = generate_candidates(&entry, &index);
        assert_eq!(candidates[0].procedure_tag, "REGIONAL");
        assert_eq!(candidates[0].bounds, Bounds { min: 1, max: 3, default: 1 });
        assert_eq!(candidates[0].score, 1.0);
    }

    #[test]
    fn test_select_keeps_near_ties() {
        let selected = select_candidates(
            vec![scored("A", 0.95), scored("B", 0.93), scored("C", 0.90), scored("D", 0.89)],
            &MatchPolicy::STANDARD,
        );
        let ids: Vec<&str> = selected.iter().map(|c| c.catalog_item_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_select_tie_band_edge_is_inclusive() {
        let selected = select_candidates(
            vec![scored("A", 0.93), scored("B", 0.88)],
            &MatchPolicy::STANDARD,
        );
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_select_drops_below_floor() {
        let selected = select_candidates(
            vec![scored("A", 0.87), scored("B", 0.50)],
            &MatchPolicy::STANDARD,
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn test_select_orders_ties_by_id() {
        let selected = select_candidates(
            vec![scored("Z", 0.95), scored("M", 0.95)],
            &MatchPolicy::STANDARD,
        );
        assert_eq!(selected[0].catalog_item_id, "M");
        assert_eq!(selected[1].catalog_item_id, "Z");
    }

    #[test]
    fn test_medium_dropped_outside_band_of_high() {
        let selected = select_candidates(
            vec![scored("A", 0.97), scored("B", 0.89)],
            &MatchPolicy::STANDARD,
        );
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].catalog_item_id, "A");
    }

    #[test]
    fn test_one_to_many_circuit_family() {
        let index = CatalogIndex::build(&circuit_catalog());
        let result = match_entry(
            &legacy("L1", "Circuito circular cerrado expandible"),
            &index,
            &MatchPolicy::STANDARD,
        );
        let ids: Vec<&str> = result
            .matches
            .iter()
            .map(|m| m.candidate.catalog_item_id.as_str())
            .collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
        assert!(result.matches.iter().all(|m| m.tier == Tier::High));
    }

    #[test]
    fn test_short_name_below_floor_is_unmatched() {
        // Containment passes, but the long catalog names pull the score under 0.88
        let index = CatalogIndex::build(&circuit_catalog());
        let result = match_entry(&legacy("L1", "CIRCUITO CIRCULAR"), &index, &MatchPolicy::STANDARD);
        assert!(result.is_unmatched());
    }

    #[test]
    fn test_diagnostic_policy_surfaces_weaker_matches() {
        let index = CatalogIndex::build(&circuit_catalog());
        let result = match_entry(&legacy("L1", "CIRCUITO CIRCULAR"), &index, &MatchPolicy::DIAGNOSTIC);
        assert_eq!(result.matches.len(), 3);
        assert!(result.matches.iter().all(|m| m.tier == Tier::Medium));
    }

    #[test]
    fn test_unrelated_name_is_unmatched() {
        let index = CatalogIndex::build(&circuit_catalog());
        let result = match_entry(&legacy("L1", "TORNIQUETE"), &index, &MatchPolicy::STANDARD);
        assert!(result.is_unmatched());
    }

    #[test]
    fn test_match_entries_preserves_order() {
        let index = CatalogIndex::build(&circuit_catalog());
        let entries: Vec<LegacyEntry> = (0..50)
            .map(|i| legacy(&format!("L{}", i), if i % 2 == 0 { "CANULA NASAL ADULTO" } else { "TORNIQUETE" }))
            .collect();
        let results = match_entries(&entries, &index, &MatchPolicy::STANDARD);
        assert_eq!(results.len(), 50);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.entry.id, format!("L{}", i));
            assert_eq!(r.is_unmatched(), i % 2 == 1);
        }
    }
}
