use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::TypeError;
use crate::id::TransactionId;

/// Check that an amount is finite and strictly positive.
///
/// NaN fails because every comparison against it is false.
pub fn validate_amount(amount: f64) -> Result<f64, TypeError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(TypeError::InvalidAmount(amount))
    }
}

/// A single ledger record.
///
/// Immutable once stored. `parent` is an unchecked link: it may name an id
/// that was never inserted, or close a cycle. Consumers must tolerate both.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: f64,
    pub category: Category,
    pub parent: Option<TransactionId>,
}

impl Transaction {
    /// Build a validated transaction.
    pub fn new(
        id: TransactionId,
        amount: f64,
        category: Category,
        parent: Option<TransactionId>,
    ) -> Result<Self, TypeError> {
        let tx = Self {
            id,
            amount,
            category,
            parent,
        };
        tx.validate()?;
        Ok(tx)
    }

    /// Re-check the amount invariant on a record built field by field.
    pub fn validate(&self) -> Result<(), TypeError> {
        validate_amount(self.amount).map(|_| ())
    }

    /// Returns `true` if the record names itself as its parent.
    pub fn is_self_parented(&self) -> bool {
        self.parent == Some(self.id)
    }
}
