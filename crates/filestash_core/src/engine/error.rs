//! Engine error types.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures raised by the embedded engine.
///
/// The variants follow the failure classes a browser's indexed database
/// reports, so callers written against either see the same categories.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Requested version is lower than the stored one.
    #[error("requested version {requested} is lower than existing version {existing}")]
    Version {
        /// Version asked for by the open request.
        requested: u32,
        /// Version the database already has.
        existing: u32,
    },

    /// An argument was rejected before touching any state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A uniqueness rule was violated, e.g. creating an existing store.
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// A value or key could not be stored.
    #[error("data error: {0}")]
    Data(String),

    /// A value is larger than the engine accepts.
    #[error("quota exceeded: value of {size} bytes exceeds limit of {limit} bytes")]
    QuotaExceeded {
        /// Size of the rejected value.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A named store does not exist or is outside the transaction scope.
    #[error("object store not found: {0}")]
    NotFound(String),

    /// The operation does not fit the current state of the object.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The transaction already committed or aborted.
    #[error("transaction {0} is no longer active")]
    TransactionInactive(u64),

    /// A write was attempted in a read-only transaction.
    #[error("transaction {0} is read-only")]
    ReadOnly(u64),

    /// The transaction or open request was aborted.
    #[error("aborted: {0}")]
    Aborted(String),

    /// The factory was built without this feature.
    #[error("not supported: {0}")]
    Unsupported(String),

    /// Another process holds the database directory.
    #[error("database locked: another process has exclusive access")]
    Locked,

    /// Persisted state failed validation.
    #[error("corrupted: {0}")]
    Corrupted(String),

    /// A stored value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Log backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] filestash_storage::StorageError),

    /// Filesystem failure outside the log.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }
}
