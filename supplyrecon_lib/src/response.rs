//! Response payload returned to the dashboard for a reconciliation request.
//!
//! Success: `{success, estadisticas, muestra_matches, sin_mapeo_muestra}`.
//! Failure: `{success: false, error}`.

use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedMatch;
use crate::model::LegacyEntry;
use crate::report::RunSummary;

/// Request flags accepted by the reconcile endpoint.
#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct ReconcileRequest {
    #[serde(rename = "includeMedium", default)]
    pub include_medium: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReconResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estadisticas: Option<Estadisticas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muestra_matches: Option<Vec<MuestraMatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sin_mapeo_muestra: Option<Vec<SinMapeo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Estadisticas {
    pub total_matches: usize,
    pub filas_insertadas: usize,
    pub filas_actualizadas: usize,
    pub registros_sin_mapeo: usize,
    pub total_registros: usize,
    pub filas_sin_cambios: usize,
    pub lotes_fallidos: usize,
    pub filas_fallidas: usize,
    pub claves_duplicadas: usize,
    pub pendientes_revision: usize,
    pub por_nivel: PorNivel,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PorNivel {
    pub alto: usize,
    pub medio: usize,
    pub bajo: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MuestraMatch {
    pub registro_id: String,
    pub nombre_insumo: String,
    pub insumo_catalogo_id: String,
    pub nombre_catalogo: String,
    pub tipo_anestesia: String,
    pub similitud: f64,
    pub nivel: String,
    pub accion: String,
}

impl From<&ClassifiedMatch> for MuestraMatch {
    fn from(m: &ClassifiedMatch) -> Self {
        Self {
            registro_id: m.candidate.legacy_id.clone(),
            nombre_insumo: m.candidate.legacy_name.clone(),
            insumo_catalogo_id: m.candidate.catalog_item_id.clone(),
            nombre_catalogo: m.candidate.catalog_name.clone(),
            tipo_anestesia: m.candidate.procedure_tag.clone(),
            similitud: truncate_score(m.score()),
            nivel: m.tier.label().to_string(),
            accion: m.action.label().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SinMapeo {
    pub registro_id: String,
    pub nombre_insumo: String,
    pub tipo_anestesia: String,
}

impl From<&LegacyEntry> for SinMapeo {
    fn from(entry: &LegacyEntry) -> Self {
        Self {
            registro_id: entry.id.clone(),
            nombre_insumo: entry.nombre_insumo.clone(),
            tipo_anestesia: entry.tipo_anestesia.clone(),
        }
    }
}

/// Round a score down to 4 decimals for display.
///
/// Never rounds up, so a displayed score stays on the same side of every tier
/// boundary as the raw score.
pub fn truncate_score(score: f64) -> f64 {
    let nearest = (score * 10_000.0).round();
    if nearest / 10_000.0 > score {
        (nearest - 1.0) / 10_000.0
    } else {
        nearest / 10_000.0
    }
}

impl ReconResponse {
    pub fn from_summary(summary: &RunSummary) -> Self {
        let merge = &summary.merge;
        Self {
            success: true,
            estadisticas: Some(Estadisticas {
                total_matches: summary.total_matches,
                filas_insertadas: merge.inserted,
                filas_actualizadas: merge.updated,
                registros_sin_mapeo: summary.unmatched,
                total_registros: summary.total_entries,
                filas_sin_cambios: merge.unchanged,
                lotes_fallidos: merge.failed_batches,
                filas_fallidas: merge.failed_rows,
                claves_duplicadas: merge.duplicate_keys,
                pendientes_revision: merge.pending_review,
                por_nivel: PorNivel {
                    alto: summary.tiers.high,
                    medio: summary.tiers.medium,
                    bajo: summary.tiers.low,
                },
            }),
            muestra_matches: Some(summary.sample_matches.iter().map(MuestraMatch::from).collect()),
            sin_mapeo_muestra: Some(summary.sample_unmatched.iter().map(SinMapeo::from).collect()),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            estadisticas: None,
            muestra_matches: None,
            sin_mapeo_muestra: None,
            error: Some(message.into()),
        }
    }
}
