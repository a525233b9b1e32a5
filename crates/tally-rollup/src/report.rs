use serde::Serialize;
use tally_types::TransactionId;

/// Outcome of a rollup traversal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RollupReport {
    /// The transaction the rollup started from.
    pub root: TransactionId,
    /// Sum of the root's amount and every included descendant's amount.
    pub total: f64,
    /// Every id whose amount was counted, root first, in discovery order.
    pub included: Vec<TransactionId>,
    /// Ids encountered again on their own path; excluded and not expanded.
    pub cycle_nodes: Vec<TransactionId>,
}

impl RollupReport {
    /// Returns `true` if the traversal ran into a cyclic parent chain.
    pub fn hit_cycle(&self) -> bool {
        !self.cycle_nodes.is_empty()
    }

    /// Number of descendants counted, excluding the root.
    pub fn descendant_count(&self) -> usize {
        self.included.len().saturating_sub(1)
    }
}
