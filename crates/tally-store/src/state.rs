//! Record set plus secondary indexes, shared by every backend.

use std::collections::HashMap;

use tally_index::{CategoryIndex, ChildIndex};
use tally_types::{Transaction, TransactionId};

use crate::error::{StoreError, StoreResult};

/// The full in-memory view of the ledger.
///
/// Backends wrap this in a lock; every mutation goes through
/// [`apply_insert`](Self::apply_insert) or [`apply_delete`](Self::apply_delete)
/// so the indexes always agree with `records`.
#[derive(Debug, Default)]
pub struct LedgerState {
    records: HashMap<TransactionId, Transaction>,
    /// Record ids in the order they were inserted.
    arrival: Vec<TransactionId>,
    categories: CategoryIndex,
    children: ChildIndex,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validate `tx` and make sure its id is free.
    pub fn check_insert(&self, tx: &Transaction) -> StoreResult<()> {
        tx.validate()?;
        if self.records.contains_key(&tx.id) {
            return Err(StoreError::DuplicateKey(tx.id));
        }
        Ok(())
    }

    /// Apply an insert that already passed [`check_insert`](Self::check_insert).
    ///
    /// A duplicate id is ignored here rather than overwriting, which keeps
    /// log replay idempotent.
    pub fn apply_insert(&mut self, tx: Transaction) -> bool {
        if self.records.contains_key(&tx.id) {
            return false;
        }
        self.arrival.push(tx.id);
        self.categories.insert(&tx.category, tx.id);
        if let Some(parent) = tx.parent {
            self.children.insert(parent, tx.id);
        }
        self.records.insert(tx.id, tx);
        true
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.records.get(&id)
    }

    pub fn ids_by_category(&self, category: &str) -> Vec<TransactionId> {
        self.categories.ids(category).to_vec()
    }

    pub fn children_of(&self, parent: TransactionId) -> Vec<Transaction> {
        self.children
            .children(parent)
            .iter()
            .filter_map(|child| self.records.get(child).cloned())
            .collect()
    }

    /// Ids a `delete(id, category)` would remove, in insertion order.
    pub fn delete_targets(&self, id: TransactionId, category: &str) -> Vec<TransactionId> {
        self.arrival
            .iter()
            .copied()
            .filter(|candidate| {
                *candidate == id
                    || self
                        .records
                        .get(candidate)
                        .is_some_and(|tx| tx.category.as_str() == category)
            })
            .collect()
    }

    /// Remove every record matching `id` or `category`. Returns how many went.
    pub fn apply_delete(&mut self, id: TransactionId, category: &str) -> usize {
        let targets = self.delete_targets(id, category);
        for target in &targets {
            if let Some(tx) = self.records.remove(target) {
                self.categories.remove(tx.category.as_str(), tx.id);
                if let Some(parent) = tx.parent {
                    self.children.remove(parent, tx.id);
                }
            }
        }
        if !targets.is_empty() {
            self.arrival.retain(|candidate| !targets.contains(candidate));
        }
        targets.len()
    }

    /// Every live record in insertion order.
    pub fn records_in_order(&self) -> Vec<Transaction> {
        self.arrival
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }
}
