//! Seams between the engine and the stores it reads and writes.
//!
//! [`Db`](crate::db::Db) implements both traits over SQLite; tests substitute
//! in-memory or failing stores.

use crate::db::DbError;
use crate::model::{CatalogItem, ConfigurationRow, LegacyEntry};

/// Read-only source of legacy entries and catalog items.
pub trait InputSource {
    /// All legacy entries, in a stable order.
    fn legacy_entries(&self) -> Result<Vec<LegacyEntry>, DbError>;

    /// Catalog items with `activo = true`.
    fn active_catalog(&self) -> Result<Vec<CatalogItem>, DbError>;
}

/// Read-write store of configuration rows keyed by `(insumo_catalogo_id, tipo_anestesia)`.
pub trait ConfigStore {
    /// Bulk read of every existing configuration row.
    fn load_configuration(&self) -> Result<Vec<ConfigurationRow>, DbError>;

    /// Insert one batch atomically. Returns the number of rows written.
    fn insert_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError>;

    /// Overwrite the bounds of existing rows in one atomic batch.
    fn update_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError>;
}
