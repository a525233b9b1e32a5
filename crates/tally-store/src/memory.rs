use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tally_types::{Transaction, TransactionId};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::state::LedgerState;
use crate::traits::LedgerStore;

/// In-memory, HashMap-based ledger store.
///
/// Intended for tests and embedding. All records live behind a `RwLock`;
/// nothing survives the process.
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn insert_now(&self, tx: Transaction) -> StoreResult<()> {
        let mut state = self.write()?;
        state.check_insert(&tx)?;
        debug!(id = %tx.id, amount = tx.amount, category = %tx.category, parent = ?tx.parent, "inserted transaction");
        state.apply_insert(tx);
        Ok(())
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, tx: Transaction) -> StoreResult<()> {
        self.insert_now(tx)
    }

    async fn get(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn find_by_category(&self, category: &str) -> StoreResult<Vec<TransactionId>> {
        Ok(self.read()?.ids_by_category(category))
    }

    async fn children_of(&self, parent: TransactionId) -> StoreResult<Vec<Transaction>> {
        Ok(self.read()?.children_of(parent))
    }

    async fn delete(&self, id: TransactionId, category: &str) -> StoreResult<usize> {
        let removed = self.write()?.apply_delete(id, category);
        debug!(%id, category, removed, "deleted transactions");
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("InMemoryLedgerStore")
            .field("record_count", &count)
            .finish()
    }
}
