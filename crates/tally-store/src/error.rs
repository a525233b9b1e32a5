use tally_types::{TransactionId, TypeError};

/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record failed validation before reaching storage.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] TypeError),

    /// A record with this id is already stored.
    #[error("duplicate transaction id: {0}")]
    DuplicateKey(TransactionId),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend cannot serve requests (poisoned lock, missing log file).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
