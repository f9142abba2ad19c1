//! Records exchanged between the engine and its collaborators.
//!
//! `LegacyEntry` and `CatalogItem` are read-only inputs. `ConfigurationRow` is the
//! only record the engine writes, keyed by [`ConfigKey`].

use serde::{Deserialize, Serialize};

/// One row of the imported legacy supply list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LegacyEntry {
    pub id: String,
    /// Raw supply name as typed in the source spreadsheet.
    pub nombre_insumo: String,
    /// Anesthesia/procedure type the entry is scoped to.
    pub tipo_anestesia: String,
    pub min_excel: Option<i64>,
    pub max_excel: Option<i64>,
}

impl LegacyEntry {
    /// Derive the configuration bounds this entry hands to its matches.
    ///
    /// Missing minimum becomes 0, missing maximum becomes the minimum, and an
    /// inverted pair is clamped so `max >= min`. The default quantity is the minimum.
    pub fn bounds(&self) -> Bounds {
        let min = self.min_excel.unwrap_or(0);
        let mut max = self.max_excel.unwrap_or(min);
        if max < min {
            tracing::warn!(
                "Legacy entry {} has max {} below min {}; clamping max to min",
                self.id,
                max,
                min
            );
            max = min;
        }
        Bounds {
            min,
            max,
            default: min,
        }
    }

    /// Procedure tag with surrounding whitespace removed, as used in configuration keys.
    pub fn procedure_tag(&self) -> &str {
        self.tipo_anestesia.trim()
    }
}

/// One canonical supply from the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub nombre: String,
    pub activo: bool,
}

/// Quantity bounds attached to a catalog item for a procedure type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

/// Composite key of a configuration row: `(insumo_catalogo_id, tipo_anestesia)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    pub catalog_item_id: String,
    pub procedure_tag: String,
}

impl ConfigKey {
    pub fn new(catalog_item_id: impl Into<String>, procedure_tag: impl Into<String>) -> Self {
        Self {
            catalog_item_id: catalog_item_id.into(),
            procedure_tag: procedure_tag.into(),
        }
    }
}

/// Persisted join between a catalog item and a procedure tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConfigurationRow {
    pub insumo_catalogo_id: String,
    pub tipo_anestesia: String,
    pub min_anestesia: i64,
    pub max_anestesia: i64,
    pub cantidad_default: i64,
}

impl ConfigurationRow {
    pub fn new(key: &ConfigKey, bounds: Bounds) -> Self {
        Self {
            insumo_catalogo_id: key.catalog_item_id.clone(),
            tipo_anestesia: key.procedure_tag.clone(),
            min_anestesia: bounds.min,
            max_anestesia: bounds.max,
            cantidad_default: bounds.default,
        }
    }

    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(&self.insumo_catalogo_id, &self.tipo_anestesia)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            min: self.min_anestesia,
            max: self.max_anestesia,
            default: self.cantidad_default,
        }
    }
}
