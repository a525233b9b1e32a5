use std::fmt;

use tally_rollup::RollupError;
use tally_store::StoreError;
use tally_types::{TransactionId, TypeError};
use thiserror::Error;

/// The public operations, used to label timeouts and pick budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Insert,
    Detail,
    ListByCategory,
    Sum,
    Purge,
    Ping,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Detail => "detail",
            Self::ListByCategory => "list-by-category",
            Self::Sum => "sum",
            Self::Purge => "purge",
            Self::Ping => "ping",
        };
        f.write_str(name)
    }
}

/// Every failure the facade reports.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or out-of-range input; storage was not touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transaction already exists: {0}")]
    DuplicateKey(TransactionId),

    #[error("transaction not found: {0}")]
    NotFound(TransactionId),

    /// Storage unreachable or misbehaving. Not retried here.
    #[error("storage failure: {0}")]
    Io(String),

    /// The operation's deadline passed; partial work was discarded.
    #[error("{0} timed out")]
    Timeout(Operation),
}

impl From<TypeError> for LedgerError {
    fn from(e: TypeError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidArgument(inner) => Self::InvalidArgument(inner.to_string()),
            StoreError::DuplicateKey(id) => Self::DuplicateKey(id),
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<RollupError> for LedgerError {
    fn from(e: RollupError) -> Self {
        match e {
            RollupError::RootNotFound(id) => Self::NotFound(id),
            RollupError::DeadlineExceeded { .. } => Self::Timeout(Operation::Sum),
            RollupError::Store(inner) => inner.into(),
        }
    }
}

/// Convenience alias for facade results.
pub type LedgerResult<T> = Result<T, LedgerError>;
