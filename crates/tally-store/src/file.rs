use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_types::{Transaction, TransactionId};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::log::{LogRecord, RecordLog, SyncMode};
use crate::state::LedgerState;
use crate::traits::LedgerStore;

/// Configuration for a [`FileLedgerStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Path of the record log.
    pub path: PathBuf,
    /// Sync/flush strategy for appends.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl FileStoreConfig {
    /// File name of the record log inside a data directory.
    pub const LOG_FILE: &'static str = "ledger.log";

    /// A config placing the log inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::LOG_FILE),
            sync_mode: SyncMode::default(),
        }
    }
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

/// Durable ledger store.
///
/// Every mutation is appended to a [`RecordLog`] before it is applied to the
/// in-memory [`LedgerState`]; opening the store replays the log. Reads are
/// served from memory.
pub struct FileLedgerStore {
    state: RwLock<LedgerState>,
    log: RecordLog,
}

impl FileLedgerStore {
    /// Open the store, creating the log if needed and replaying it.
    pub fn open(config: &FileStoreConfig) -> StoreResult<Self> {
        let log = RecordLog::open(&config.path, config.sync_mode)?;
        let mut state = LedgerState::new();

        let records = log.recover()?;
        let replayed = records.len();
        for record in records {
            match record {
                LogRecord::Insert(tx) => {
                    state.apply_insert(tx);
                }
                LogRecord::Delete { id, category } => {
                    state.apply_delete(id, &category);
                }
            }
        }

        info!(
            path = %config.path.display(),
            replayed,
            records = state.len(),
            "opened ledger log"
        );

        Ok(Self {
            state: RwLock::new(state),
            log,
        })
    }

    /// Path of the underlying record log.
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Rewrite the log so it holds only the live records, in insertion order.
    ///
    /// Returns the number of records kept.
    pub fn compact(&self) -> StoreResult<usize> {
        // Hold the write lock so no insert lands in the old file mid-rewrite.
        let state = self.write()?;
        let live: Vec<LogRecord> = state
            .records_in_order()
            .into_iter()
            .map(LogRecord::Insert)
            .collect();
        let before = self.log.offset()?;
        self.log.rewrite(&live)?;
        info!(
            records = live.len(),
            bytes_before = before,
            bytes_after = self.log.offset()?,
            "compacted ledger log"
        );
        Ok(live.len())
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
        self.log.append(&LogRecord::Insert(tx.clone()))?;
        debug!(id = %tx.id, amount = tx.amount, category = %tx.category, parent = ?tx.parent, "inserted transaction");
        state.apply_insert(tx);
        Ok(())
    }

    fn delete_now(&self, id: TransactionId, category: &str) -> StoreResult<usize> {
        let mut state = self.write()?;
        if state.delete_targets(id, category).is_empty() {
            return Ok(0);
        }
        self.log.append(&LogRecord::Delete {
            id,
            category: category.to_string(),
        })?;
        let removed = state.apply_delete(id, category);
        debug!(%id, category, removed, "deleted transactions");
        Ok(removed)
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
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
        self.delete_now(id, category)
    }

    async fn ping(&self) -> StoreResult<()> {
        drop(self.read()?);
        let path = self.log.path();
        if !path.is_file() {
            return Err(StoreError::Unavailable(format!(
                "record log missing: {}",
                path.display()
            )));
        }
        Ok(())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }
}

impl std::fmt::Debug for FileLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("FileLedgerStore")
            .field("path", &self.log.path())
            .field("record_count", &count)
            .finish()
    }
}
