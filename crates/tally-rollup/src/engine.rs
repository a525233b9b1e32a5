//! Breadth-first descendant traversal with per-branch cycle detection.
//!
//! The traversal keeps an arena of [`Slot`]s. Each slot records the id it
//! stands for and the index of the slot that discovered it, so the path from
//! any slot back to the root is a walk over `parent_slot` indices. A
//! candidate is a cycle node exactly when its id is already on that walk.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tally_store::{LedgerStore, StoreResult};
use tally_types::{Deadline, TransactionId};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{RollupError, RollupResult};
use crate::report::RollupReport;

/// One included transaction in the traversal arena.
#[derive(Clone, Copy, Debug)]
struct Slot {
    id: TransactionId,
    /// Arena index of the slot this one was discovered from; `None` for the root.
    parent_slot: Option<usize>,
}

/// Returns `true` if `id` appears on the path from `slot` back to the root.
fn on_path(arena: &[Slot], slot: usize, id: TransactionId) -> bool {
    let mut cursor = Some(slot);
    while let Some(index) = cursor {
        let current = arena[index];
        if current.id == id {
            return true;
        }
        cursor = current.parent_slot;
    }
    false
}

/// Computes rollup sums against a [`LedgerStore`].
///
/// Holds no traversal state between calls; cloning is cheap.
#[derive(Clone)]
pub struct RollupEngine {
    store: Arc<dyn LedgerStore>,
}

impl RollupEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Total amount of `root` plus all of its descendants.
    pub async fn sum(&self, root: TransactionId, deadline: Deadline) -> RollupResult<f64> {
        self.rollup(root, deadline).await.map(|report| report.total)
    }

    /// Run the traversal and return the full report.
    ///
    /// The root's own amount is always counted once. Every other candidate
    /// is counted unless its id is already on the path that reached it.
    /// Each store read is bounded by `deadline`; expiry abandons the whole
    /// traversal with [`RollupError::DeadlineExceeded`].
    pub async fn rollup(&self, root: TransactionId, deadline: Deadline) -> RollupResult<RollupReport> {
        let started = Instant::now();
        let mut expanded = 0usize;

        let root_tx = self
            .bounded(root, started, expanded, deadline, self.store.get(root))
            .await?
            .ok_or(RollupError::RootNotFound(root))?;

        let mut arena = vec![Slot {
            id: root,
            parent_slot: None,
        }];
        let mut frontier = VecDeque::from([0usize]);
        let mut total = root_tx.amount;
        let mut cycle_nodes = Vec::new();

        while let Some(slot) = frontier.pop_front() {
            let id = arena[slot].id;
            let children = self
                .bounded(root, started, expanded, deadline, self.store.children_of(id))
                .await?;
            expanded += 1;

            for child in children {
                if on_path(&arena, slot, child.id) {
                    debug!(%root, cycle_node = %child.id, via = %id, "cycle detected; branch closed");
                    cycle_nodes.push(child.id);
                    continue;
                }
                total += child.amount;
                arena.push(Slot {
                    id: child.id,
                    parent_slot: Some(slot),
                });
                frontier.push_back(arena.len() - 1);
            }
        }

        debug!(
            %root,
            total,
            included = arena.len(),
            cycles = cycle_nodes.len(),
            elapsed = ?started.elapsed(),
            "rollup complete"
        );

        Ok(RollupReport {
            root,
            total,
            included: arena.into_iter().map(|slot| slot.id).collect(),
            cycle_nodes,
        })
    }

    /// Await one store read, giving up at `deadline`.
    ///
    /// An already-expired deadline fails before the read is issued, so a
    /// traversal over a fast in-memory store still stops on time.
    async fn bounded<T>(
        &self,
        root: TransactionId,
        started: Instant,
        expanded: usize,
        deadline: Deadline,
        read: impl Future<Output = StoreResult<T>>,
    ) -> RollupResult<T> {
        let exceeded = || {
            warn!(%root, expanded, "rollup deadline exceeded");
            RollupError::DeadlineExceeded {
                root,
                elapsed: started.elapsed(),
                expanded,
            }
        };

        if deadline.is_expired() {
            return Err(exceeded());
        }
        match tokio::time::timeout_at(deadline.instant(), read).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(exceeded()),
        }
    }
}

impl std::fmt::Debug for RollupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollupEngine").finish_non_exhaustive()
    }
}
