//! Error types for rollup aggregation.

use std::time::Duration;

use tally_types::TransactionId;

/// Errors that can occur while computing a rollup.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    /// The root has no stored transaction.
    #[error("transaction not found: {0}")]
    RootNotFound(TransactionId),

    /// The deadline passed before the traversal finished.
    #[error("rollup of {root} abandoned after {elapsed:?} with {expanded} nodes expanded")]
    DeadlineExceeded {
        /// The root being aggregated.
        root: TransactionId,
        /// Time spent before giving up.
        elapsed: Duration,
        /// Frontier nodes whose children had been read.
        expanded: usize,
    },

    /// A store read failed.
    #[error("store error: {0}")]
    Store(#[from] tally_store::StoreError),
}

/// Convenience alias for rollup results.
pub type RollupResult<T> = Result<T, RollupError>;
