use async_trait::async_trait;
use tally_types::{Transaction, TransactionId};

use crate::error::StoreResult;

/// Keyed transaction storage with category and child lookups.
///
/// All implementations must satisfy these invariants:
/// - `insert` rejects invalid amounts with `InvalidArgument` before touching
///   storage, and rejects an existing id with `DuplicateKey` without
///   overwriting it.
/// - `parent` is never checked: dangling and cyclic links are stored as given.
/// - Sequences are returned in insertion order.
/// - Concurrent reads are always safe.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Store a new record.
    ///
    /// Applied whole or not at all. Durable backends sync to disk while
    /// holding their write lock, and the returned future has no await point,
    /// so a caller's timeout cannot interrupt the write. A slow sync can
    /// return `Ok` after the caller's deadline; the record is then stored.
    async fn insert(&self, tx: Transaction) -> StoreResult<()>;

    /// Read a record by id.
    ///
    /// Returns `Ok(None)` if the record does not exist.
    async fn get(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;

    /// Ids of every record carrying `category`, oldest first.
    ///
    /// An unused category yields an empty vec, not an error.
    async fn find_by_category(&self, category: &str) -> StoreResult<Vec<TransactionId>>;

    /// Records whose `parent` equals `parent`, oldest first.
    async fn children_of(&self, parent: TransactionId) -> StoreResult<Vec<Transaction>>;

    /// Remove every record whose id equals `id` OR whose category equals
    /// `category`. Returns the number of records removed.
    ///
    /// Intentionally broad; meant for maintenance and test cleanup.
    async fn delete(&self, id: TransactionId, category: &str) -> StoreResult<usize>;

    /// Liveness check of the backend.
    async fn ping(&self) -> StoreResult<()>;

    /// Number of stored records.
    async fn count(&self) -> StoreResult<usize>;
}
