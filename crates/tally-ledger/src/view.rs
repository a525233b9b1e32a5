//! Serializable shapes handed back to front ends.

use serde::{Deserialize, Serialize};
use tally_types::{Transaction, TransactionId};

/// Point-detail view of a transaction: everything but its id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub amount: f64,
    #[serde(rename = "type")]
    pub category: String,
    pub parent_id: Option<TransactionId>,
}

impl From<Transaction> for TransactionDetail {
    fn from(tx: Transaction) -> Self {
        Self {
            amount: tx.amount,
            category: tx.category.into(),
            parent_id: tx.parent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SumView {
    pub sum: f64,
}

/// Liveness probe result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Unhealthy,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}
