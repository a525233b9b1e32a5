use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Operation;

/// Per-operation time budgets for the ledger facade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Budget for inserts, in milliseconds.
    pub insert_timeout_ms: u64,
    /// Budget for point reads, category reads, purges and the health probe.
    pub read_timeout_ms: u64,
    /// Budget for a whole rollup traversal.
    pub sum_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            insert_timeout_ms: 5_000,
            read_timeout_ms: 5_000,
            sum_timeout_ms: 10_000,
        }
    }
}

impl LedgerConfig {
    /// The configured budget for `operation`.
    pub fn timeout(&self, operation: Operation) -> Duration {
        let ms = match operation {
            Operation::Insert => self.insert_timeout_ms,
            Operation::Sum => self.sum_timeout_ms,
            Operation::Detail | Operation::ListByCategory | Operation::Purge | Operation::Ping => {
                self.read_timeout_ms
            }
        };
        Duration::from_millis(ms)
    }
}
