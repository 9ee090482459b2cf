//! Error types for the file store.

use crate::engine::EngineError;
use thiserror::Error;

/// Result type for file store operations.
pub type StashResult<T> = Result<T, StashError>;

/// Errors reported by [`crate::StorageHandle`] and [`crate::Database`].
#[derive(Debug, Error)]
pub enum StashError {
    /// The environment has no database factory.
    #[error("local file storage is not supported in this environment")]
    Unsupported,

    /// Another session keeps an older version of the database open.
    #[error("opening {name} is blocked by another open session; close it and retry")]
    OpenBlocked {
        /// Database name.
        name: String,
        /// Version held by the other session.
        old_version: u32,
        /// Version this handle asked for.
        new_version: u32,
    },

    /// The engine refused to open the database.
    #[error("failed to open database: {0}")]
    OpenFailed(#[source] EngineError),

    /// Creating the record store during the upgrade failed.
    #[error("failed to create record store during upgrade: {0}")]
    UpgradeSchema(#[source] EngineError),

    /// The caller passed something unusable.
    #[error("invalid input: {0}")]
    Validation(String),

    /// At least one record of a batch could not be written.
    #[error("{failed} of {total} records could not be stored: {source}")]
    WriteFailure {
        /// Records whose put failed.
        failed: usize,
        /// Records in the batch.
        total: usize,
        /// First error observed.
        #[source]
        source: EngineError,
    },

    /// Reading the record store failed.
    #[error("failed to read records: {0}")]
    ReadFailure(#[source] EngineError),

    /// The handle has no open database.
    #[error("database is not open")]
    NotOpen,
}
