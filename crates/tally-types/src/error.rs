use thiserror::Error;

/// Errors produced while parsing or validating ledger input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("missing or invalid transaction id: {0:?}")]
    InvalidId(String),

    #[error("amount must be a finite value greater than zero, got {0}")]
    InvalidAmount(f64),

    #[error("category must not be empty")]
    EmptyCategory,
}
