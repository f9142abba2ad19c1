//! Error types for reconciliation runs.
//!
//! Only unreadable inputs and a busy run guard are errors. Unmatched entries,
//! ambiguous multi-candidate matches, and failed write batches are reported
//! through the run summary instead.

use crate::db::DbError;

#[derive(thiserror::Error, Debug)]
pub enum ReconError {
    /// The legacy list or the catalog could not be read. Nothing was written.
    #[error("{input} input unavailable: {source}")]
    InputUnavailable {
        input: &'static str,
        #[source]
        source: DbError,
    },
    /// The bulk read of existing configuration rows failed. Nothing was written.
    #[error("configuration rows unavailable: {0}")]
    ConfigurationUnavailable(#[source] DbError),
    /// Another run currently holds the run guard.
    #[error("a reconciliation run is already in progress")]
    RunInProgress,
}
