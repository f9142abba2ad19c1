//! Reconciliation runs: inputs → matching → classification → merge → summary.
//!
//! [`Engine`] owns its store behind a mutex. Holding the lock is the run guard,
//! so at most one run (or diagnostic pass) touches the store at a time; a second
//! caller gets [`ReconError::RunInProgress`] instead of waiting.

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::Instant;

use crate::classify::ClassifiedMatch;
use crate::error::ReconError;
use crate::matching::{match_entries, CatalogIndex, EntryMatches, MatchPolicy};
use crate::model::LegacyEntry;
use crate::reconcile::{reconcile, RunMode};
use crate::report::{diagnostic_report, summarize, DiagnosticReport, RunSummary, DEFAULT_SAMPLE_SIZE};
use crate::store::{ConfigStore, InputSource};

/// State scoped to exactly one run.
pub struct RunContext {
    pub mode: RunMode,
    pub policy: MatchPolicy,
    pub sample_size: usize,
    pub entries: Vec<LegacyEntry>,
    pub catalog: CatalogIndex,
}

impl RunContext {
    /// Read both inputs. Either read failing aborts the run.
    pub fn load<S: InputSource + ?Sized>(
        source: &S,
        mode: RunMode,
        policy: MatchPolicy,
        sample_size: usize,
    ) -> Result<Self, ReconError> {
        let entries = source
            .legacy_entries()
            .map_err(|source| ReconError::InputUnavailable {
                input: "legacy",
                source,
            })?;
        let catalog = source
            .active_catalog()
            .map_err(|source| ReconError::InputUnavailable {
                input: "catalog",
                source,
            })?;

        Ok(Self {
            mode,
            policy,
            sample_size,
            entries,
            catalog: CatalogIndex::build(&catalog),
        })
    }

    pub fn match_all(&self) -> Vec<EntryMatches> {
        match_entries(&self.entries, &self.catalog, &self.policy)
    }
}

pub struct Engine<S> {
    store: Mutex<S>,
    sample_size: usize,
}

impl<S> Engine<S>
where
    S: InputSource + ConfigStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Run one reconciliation and write its results.
    pub fn run(&self, mode: RunMode) -> Result<RunSummary, ReconError> {
        let mut store = self.acquire()?;
        let started = Instant::now();

        let ctx = RunContext::load(&*store, mode, MatchPolicy::STANDARD, self.sample_size)?;
        tracing::info!(
            "Reconciling {} legacy entries against {} active catalog items (include_medium={})",
            ctx.entries.len(),
            ctx.catalog.len(),
            mode.include_medium
        );

        let results = ctx.match_all();
        for r in results.iter().filter(|r| r.is_unmatched()) {
            tracing::debug!("No candidate for legacy entry {} ({})", r.entry.id, r.entry.nombre_insumo);
        }

        let matches: Vec<ClassifiedMatch> = results
            .iter()
            .flat_map(|r| r.matches.iter().cloned())
            .collect();
        let merge = reconcile(&mut *store, &matches, ctx.mode)?;

        let summary = summarize(&results, merge, ctx.mode, ctx.sample_size);
        tracing::info!(
            "Run finished in {:?}: {} matches ({} high, {} medium), {} unmatched; {} inserted, {} updated, {} unchanged, {} failed batches",
            started.elapsed(),
            summary.total_matches,
            summary.tiers.high,
            summary.tiers.medium,
            summary.unmatched,
            summary.merge.inserted,
            summary.merge.updated,
            summary.merge.unchanged,
            summary.merge.failed_batches
        );
        Ok(summary)
    }

    /// Classify with the lowered diagnostic floor. Writes nothing.
    pub fn diagnose(&self) -> Result<DiagnosticReport, ReconError> {
        let store = self.acquire()?;
        let ctx = RunContext::load(
            &*store,
            RunMode::high_only(),
            MatchPolicy::DIAGNOSTIC,
            self.sample_size,
        )?;
        let report = diagnostic_report(ctx.match_all(), ctx.policy.floor());
        tracing::info!(
            "Diagnostic pass: {} matches ({} low), {} unmatched",
            report.matches.len(),
            report.tiers.low,
            report.unmatched.len()
        );
        Ok(report)
    }

    /// Consume the engine and return its store.
    pub fn into_inner(self) -> S {
        match self.store.into_inner() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, S>, ReconError> {
        match self.store.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(ReconError::RunInProgress),
            // Writes are transactional per batch, so a panicked run leaves no torn rows
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbError;
    use crate::model::{CatalogItem, ConfigurationRow};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Arc;

    #[derive(Default)]
    struct MemoryStore {
        legacy: Vec<LegacyEntry>,
        catalog: Vec<CatalogItem>,
        rows: Vec<ConfigurationRow>,
        legacy_offline: bool,
        writes: usize,
    }

    impl InputSource for MemoryStore {
        fn legacy_entries(&self) -> Result<Vec<LegacyEntry>, DbError> {
            if self.legacy_offline {
                return Err(DbError::Rejected("legacy table offline".to_string()));
            }
            Ok(self.legacy.clone())
        }

        fn active_catalog(&self) -> Result<Vec<CatalogItem>, DbError> {
            Ok(self.catalog.iter().filter(|c| c.activo).cloned().collect())
        }
    }

    impl ConfigStore for MemoryStore {
        fn load_configuration(&self) -> Result<Vec<ConfigurationRow>, DbError> {
            Ok(self.rows.clone())
        }

        fn insert_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError> {
            self.writes += 1;
            self.rows.extend_from_slice(rows);
            Ok(rows.len())
        }

        fn update_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError> {
            self.writes += 1;
            for row in rows {
                if let Some(existing) = self.rows.iter_mut().find(|r| r.key() == row.key()) {
                    *existing = row.clone();
                }
            }
            Ok(rows.len())
        }
    }

    fn legacy(id: &str, name: &str, min: i64, max: i64) -> LegacyEntry {
        LegacyEntry {
            id: id.to_string(),
            nombre_insumo: name.to_string(),
            tipo_anestesia: "GENERAL".to_string(),
            min_excel: Some(min),
            max_excel: Some(max),
        }
    }

    fn item(id: &str, name: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            nombre: name.to_string(),
            activo: true,
        }
    }

    fn sample_store() -> MemoryStore {
        MemoryStore {
            legacy: vec![
                legacy("1", "Gasa estéril", 1, 3),
                legacy("2", "Circuito circular cerrado expandible", 1, 1),
                legacy("3", "Torniquete", 1, 1),
            ],
            catalog: vec![
                item("C-GASA", "GASA ESTERIL"),
                item("C-CIR-A", "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (ADULTO)"),
                item("C-CIR-N", "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (NEONATAL)"),
                item("C-CIR-P", "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (PEDIÁTRICO)"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_run_then_rerun_is_idempotent() {
        let engine = Engine::new(sample_store());

        let first = engine.run(RunMode::high_only()).unwrap();
        assert_eq!(first.total_entries, 3);
        assert_eq!(first.total_matches, 4);
        assert_eq!(first.unmatched, 1);
        assert_eq!(first.merge.inserted, 4);

        let second = engine.run(RunMode::high_only()).unwrap();
        assert_eq!(second.merge.inserted, 0);
        assert_eq!(second.merge.updated, 0);
        assert_eq!(second.merge.unchanged, 4);

        let store = engine.into_inner();
        assert_eq!(store.rows.len(), 4);
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn test_changed_source_bound_updates_row() {
        let engine = Engine::new(sample_store());
        engine.run(RunMode::high_only()).unwrap();

        let mut store = engine.into_inner();
        store.legacy[0].max_excel = Some(4);
        let engine = Engine::new(store);
        let summary = engine.run(RunMode::high_only()).unwrap();
        assert_eq!(summary.merge.updated, 1);
        assert_eq!(summary.merge.inserted, 0);

        let store = engine.into_inner();
        let gasa = store
            .rows
            .iter()
            .find(|r| r.insumo_catalogo_id == "C-GASA")
            .unwrap();
        assert_eq!((gasa.min_anestesia, gasa.max_anestesia, gasa.cantidad_default), (1, 4, 1));
    }

    #[test]
    fn test_unreadable_legacy_is_fatal() {
        let store = MemoryStore {
            legacy_offline: true,
            ..sample_store()
        };
        let engine = Engine::new(store);
        let result = engine.run(RunMode::high_only());
        assert!(matches!(
            result,
            Err(ReconError::InputUnavailable { input: "legacy", .. })
        ));
        assert_eq!(engine.into_inner().writes, 0);
    }

    #[test]
    fn test_diagnose_writes_nothing() {
        let mut store = sample_store();
        store.legacy.push(legacy("4", "Circuito circular", 1, 1));
        let engine = Engine::new(store);
        let report = engine.diagnose().unwrap();
        assert_eq!(report.tiers.medium, 3);
        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(engine.into_inner().writes, 0);
    }

    #[test]
    fn test_sample_size_applies() {
        let engine = Engine::new(sample_store()).with_sample_size(2);
        let summary = engine.run(RunMode::high_only()).unwrap();
        assert_eq!(summary.sample_matches.len(), 2);
        assert_eq!(summary.total_matches, 4);
    }

    /// Store whose legacy read blocks until the test releases it.
    struct GatedStore {
        inner: MemoryStore,
        started: Sender<()>,
        release: Mutex<Receiver<()>>,
    }

    impl InputSource for GatedStore {
        fn legacy_entries(&self) -> Result<Vec<LegacyEntry>, DbError> {
            let _ = self.started.send(());
            if let Ok(rx) = self.release.lock() {
                let _ = rx.recv();
            }
            self.inner.legacy_entries()
        }

        fn active_catalog(&self) -> Result<Vec<CatalogItem>, DbError> {
            self.inner.active_catalog()
        }
    }

    impl ConfigStore for GatedStore {
        fn load_configuration(&self) -> Result<Vec<ConfigurationRow>, DbError> {
            self.inner.load_configuration()
        }

        fn insert_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError> {
            self.inner.insert_configuration(rows)
        }

        fn update_configuration(&mut self, rows: &[ConfigurationRow]) -> Result<usize, DbError> {
            self.inner.update_configuration(rows)
        }
    }

    #[test]
    fn test_concurrent_run_is_refused() {
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        let engine = Arc::new(Engine::new(GatedStore {
            inner: sample_store(),
            started: started_tx,
            release: Mutex::new(release_rx),
        }));

        let worker = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.run(RunMode::high_only()))
        };

        started_rx.recv().unwrap();
        assert!(matches!(
            engine.run(RunMode::high_only()),
            Err(ReconError::RunInProgress)
        ));
        assert!(matches!(engine.diagnose(), Err(ReconError::RunInProgress)));

        release_tx.send(()).unwrap();
        let summary = worker.join().unwrap().unwrap();
        assert_eq!(summary.merge.inserted, 4);

        // The guard is free again once the first run finishes
        release_tx.send(()).unwrap();
        let rerun = engine.run(RunMode::high_only()).unwrap();
        assert_eq!(rerun.merge.unchanged, 4);
    }
}
