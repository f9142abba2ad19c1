//! Catalog reconciliation for hospital supply lists.
//!
//! Maps a loosely structured legacy list of supply names onto the canonical
//! supply catalog with Jaro-Winkler matching, classifies each match by
//! confidence, and merges accepted matches into configuration rows without
//! duplicating or clobbering existing data.

pub mod classify;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod matching;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod response;
pub mod similarity;
pub mod store;

pub use classify::{ClassifiedMatch, SuggestedAction, Tier, TierCounts};
pub use config::{ConfigError, ReconConfig};
pub use db::{Db, DbError};
pub use engine::{Engine, RunContext};
pub use error::ReconError;
pub use matching::{Candidate, CatalogIndex, MatchPolicy};
pub use model::{Bounds, CatalogItem, ConfigKey, ConfigurationRow, LegacyEntry};
pub use normalize::normalize;
pub use reconcile::{MergeOutcome, RunMode};
pub use report::{DiagnosticReport, RunSummary};
pub use response::{ReconResponse, ReconcileRequest};
pub use similarity::similarity;
pub use store::{ConfigStore, InputSource};
