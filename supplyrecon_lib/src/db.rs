//! SQLite storage for legacy entries, the supply catalog, and configuration rows.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::model::{CatalogItem, ConfigurationRow, LegacyEntry};
use crate::store::{ConfigStore, InputSource};

/// Current schema version, tracked in the `user_version` pragma.
const SCHEMA_VERSION: i32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("write rejected: {0}")]
    Rejected(String),
}

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for tests).
    #[doc(hidden)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version < SCHEMA_VERSION {
            self.conn
                .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }

    /// Insert or replace legacy entries, keyed by id.
    pub fn upsert_legacy_entries(&mut self, entries: &[LegacyEntry]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO insumos_legacy (id, nombre_insumo, tipo_anestesia, min_excel, max_excel)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                   nombre_insumo = excluded.nombre_insumo,
                   tipo_anestesia = excluded.tipo_anestesia,
                   min_excel = excluded.min_excel,
                   max_excel = excluded.max_excel",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.id,
                    entry.nombre_insumo,
                    entry.tipo_anestesia,
                    entry.min_excel,
                    entry.max_excel,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Insert or replace catalog items, keyed by id.
    pub fn upsert_catalog_items(&mut self, items: &[CatalogItem]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO insumos_catalogo (id, nombre, activo)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                   nombre = excluded.nombre,
                   activo = excluded.activo",
            )?;
            for item in items {
                stmt.execute(params![item.id, item.nombre, item.activo])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn legacy_count(&self) -> Result<i64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM insumos_legacy", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn catalog_count(&self) -> Result<i64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM insumos_catalogo", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn configuration_count(&self) -> Result<i64, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM configuracion_insumos",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl InputSource for Db {
    fn legacy_entries(&self) -> Result<Vec<LegacyEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, nombre_insumo, tipo_anestesia, min_excel, max_excel
             FROM insumos_legacy
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LegacyEntry {
                id: row.get(0)?,
                nombre_insumo: row.get(1)?,
                tipo_anestesia: row.get(2)?,
                min_excel: row.get(3)?,
                max_excel: row.get(4)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn active_catalog(&self) -> Result<Vec<CatalogItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, nombre, activo FROM insumos_catalogo WHERE activo = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CatalogItem {
                id: row.get(0)?,
                nombre: row.get(1)?,
                activo: row.get(2)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

impl ConfigStore for Db {
    fn load_configuration(&self) -> Result<Vec<ConfigurationRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT insumo_catalogo_id, tipo_anestesia, min_anestesia, max_anestesia, cantidad_default
             FROM configuracion_insumos",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ConfigurationRow {
                insumo_catalogo_id: row.get(0)?,
                tipo_anestesia: row.get(1)?,
                min_anestesia: row.get(2)?,
                max_anestesia: row.get(3)?,
                cantidad_default: row.get(4)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn insert_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO configuracion_insumos (
                    insumo_catalogo_id, tipo_anestesia, min_anestesia, max_anestesia,
                    cantidad_default, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'), datetime('now'))",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.insumo_catalogo_id,
                    row.tipo_anestesia,
                    row.min_anestesia,
                    row.max_anestesia,
                    row.cantidad_default,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    fn update_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE configuracion_insumos
                 SET min_anestesia = ?3,
                     max_anestesia = ?4,
                     cantidad_default = ?5,
                     updated_at = datetime('now')
                 WHERE insumo_catalogo_id = ?1 AND tipo_anestesia = ?2",
            )?;
            for row in rows {
                let changed = stmt.execute(params![
                    row.insumo_catalogo_id,
                    row.tipo_anestesia,
                    row.min_anestesia,
                    row.max_anestesia,
                    row.cantidad_default,
                ])?;
                if changed == 0 {
                    // Dropping the transaction rolls back the whole batch
                    return Err(DbError::Rejected(format!(
                        "no configuration row for ({}, {})",
                        row.insumo_catalogo_id, row.tipo_anestesia
                    )));
                }
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}
