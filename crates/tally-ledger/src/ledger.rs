use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_rollup::{RollupEngine, RollupReport};
use tally_store::{LedgerStore, StoreResult};
use tally_types::{Category, Deadline, Transaction, TransactionId, TypeError};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult, Operation};
use crate::view::{Health, TransactionDetail};

/// Caller-supplied fields for a new transaction, before validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub category: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

impl NewTransaction {
    pub fn new(amount: f64, category: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            amount,
            category: category.into(),
            parent_id,
        }
    }

    /// Validate every field and build the record to store under `raw_id`.
    pub fn into_transaction(self, raw_id: &str) -> Result<Transaction, TypeError> {
        let id = TransactionId::parse(raw_id)?;
        let category = Category::new(self.category)?;
        let parent = self.parent_id.map(TransactionId::new).transpose()?;
        Transaction::new(id, self.amount, category, parent)
    }
}

/// The public operation surface over a store and a rollup engine.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and the
/// store handles its own locking.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    engine: RollupEngine,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        let engine = RollupEngine::new(Arc::clone(&store));
        Self {
            store,
            engine,
            config,
        }
    }

    /// A deadline for `operation` using the configured budget.
    pub fn deadline(&self, operation: Operation) -> Deadline {
        Deadline::after(self.config.timeout(operation))
    }

    /// Store a new transaction under `raw_id`.
    ///
    /// All input is validated before storage is touched. Parent links are
    /// not checked for existence.
    pub async fn insert(
        &self,
        raw_id: &str,
        input: NewTransaction,
        deadline: Deadline,
    ) -> LedgerResult<TransactionId> {
        let tx = input
            .into_transaction(raw_id)
            .inspect_err(|e| warn!(raw_id, error = %e, "insert rejected"))?;
        let id = tx.id;
        if tx.is_self_parented() {
            debug!(%id, "transaction names itself as parent");
        }

        bounded(Operation::Insert, deadline, self.store.insert(tx)).await?;
        info!(%id, "transaction inserted");
        Ok(id)
    }

    /// Amount, category and parent of one transaction.
    pub async fn detail(&self, raw_id: &str, deadline: Deadline) -> LedgerResult<TransactionDetail> {
        let id = TransactionId::parse(raw_id)?;
        bounded(Operation::Detail, deadline, self.store.get(id))
            .await?
            .map(TransactionDetail::from)
            .ok_or(LedgerError::NotFound(id))
    }

    /// Ids carrying `category`, in insertion order. Unknown categories
    /// yield an empty list.
    pub async fn ids_by_category(
        &self,
        category: &str,
        deadline: Deadline,
    ) -> LedgerResult<Vec<TransactionId>> {
        let category = Category::new(category)?;
        let ids = bounded(
            Operation::ListByCategory,
            deadline,
            self.store.find_by_category(category.as_str()),
        )
        .await?;
        debug!(%category, count = ids.len(), "category listed");
        Ok(ids)
    }

    /// Rollup sum of `raw_id` and its descendants.
    pub async fn sum(&self, raw_id: &str, deadline: Deadline) -> LedgerResult<f64> {
        let id = TransactionId::parse(raw_id)?;
        Ok(self.engine.sum(id, deadline).await?)
    }

    /// Rollup with the included ids and the cycle nodes that were skipped.
    pub async fn rollup(&self, raw_id: &str, deadline: Deadline) -> LedgerResult<RollupReport> {
        let id = TransactionId::parse(raw_id)?;
        let report = self.engine.rollup(id, deadline).await?;
        if report.hit_cycle() {
            warn!(root = %id, cycle_nodes = ?report.cycle_nodes, "rollup crossed a parent cycle");
        }
        Ok(report)
    }

    /// Liveness probe. Never fails; problems show up as `Unhealthy`.
    pub async fn health(&self) -> Health {
        let deadline = self.deadline(Operation::Ping);
        match bounded(Operation::Ping, deadline, self.store.ping()).await {
            Ok(()) => Health::Healthy,
            Err(e) => {
                warn!(error = %e, "health probe failed");
                Health::Unhealthy
            }
        }
    }

    /// Remove the transaction `raw_id` and every transaction in `category`.
    ///
    /// An empty `category` matches nothing, so only the id is removed.
    /// Returns the number of records removed.
    pub async fn purge(&self, raw_id: &str, category: &str, deadline: Deadline) -> LedgerResult<usize> {
        let id = TransactionId::parse(raw_id)?;
        let removed = bounded(Operation::Purge, deadline, self.store.delete(id, category)).await?;
        info!(%id, category, removed, "purge complete");
        Ok(removed)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Await one store call, giving up at `deadline`.
///
/// An expired deadline fails before the call is issued, so a write that
/// would have run past its budget never reaches storage.
async fn bounded<T>(
    operation: Operation,
    deadline: Deadline,
    call: impl Future<Output = StoreResult<T>>,
) -> LedgerResult<T> {
    if deadline.is_expired() {
        warn!(%operation, "deadline expired before store call");
        return Err(LedgerError::Timeout(operation));
    }
    match tokio::time::timeout_at(deadline.instant(), call).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(%operation, "store call timed out");
            Err(LedgerError::Timeout(operation))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use tally_store::{FileLedgerStore, FileStoreConfig, InMemoryLedgerStore, StoreError};

    fn memory_ledger() -> Ledger {
        Ledger::new(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default())
    }

    fn far() -> Deadline {
        Deadline::after(Duration::from_secs(60))
    }

    fn id(raw: i64) -> TransactionId {
        TransactionId::new(raw).unwrap()
    }

    async fn put(ledger: &Ledger, raw_id: &str, amount: f64, category: &str, parent: Option<i64>) {
        ledger
            .insert(raw_id, NewTransaction::new(amount, category, parent), far())
            .await
            .unwrap();
    }

    // ----------------------------------------------------------
    // End-to-end behaviour
    // ----------------------------------------------------------

    #[tokio::test]
    async fn parent_child_scenario() {
        let ledger = memory_ledger();
        put(&ledger, "1", 10.0, "ANIMALS", None).await;
        put(&ledger, "2", 100.0, "ANIMALS", Some(1)).await;

        assert_eq!(ledger.sum("1", far()).await.unwrap(), 110.0);
        assert_eq!(ledger.sum("2", far()).await.unwrap(), 100.0);
        assert_eq!(
            ledger.ids_by_category("ANIMALS", far()).await.unwrap(),
            vec![id(1), id(2)]
        );

        let detail = ledger.detail("1", far()).await.unwrap();
        assert_eq!(
            serde_json::to_value(&detail).unwrap(),
            json!({"amount": 10.0, "type": "ANIMALS", "parent_id": null})
        );
        let detail = ledger.detail("2", far()).await.unwrap();
        assert_eq!(detail.parent_id, Some(id(1)));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let ledger = memory_ledger();
        put(&ledger, "1", 10.0, "ANIMALS", None).await;
        let err = ledger
            .insert("1", NewTransaction::new(99.0, "CARS", None), far())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateKey(n) if n == id(1)));
        assert_eq!(ledger.detail("1", far()).await.unwrap().amount, 10.0);
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let ledger = memory_ledger();
        assert!(matches!(
            ledger.detail("7", far()).await,
            Err(LedgerError::NotFound(n)) if n == id(7)
        ));
        assert!(matches!(
            ledger.sum("7", far()).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(ledger.ids_by_category("NOPE", far()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_input_is_invalid_argument() {
        let ledger = memory_ledger();
        let cases = [
            ("abc", NewTransaction::new(1.0, "A", None)),
            ("0", NewTransaction::new(1.0, "A", None)),
            ("-3", NewTransaction::new(1.0, "A", None)),
            ("1", NewTransaction::new(0.0, "A", None)),
            ("1", NewTransaction::new(-5.0, "A", None)),
            ("1", NewTransaction::new(f64::NAN, "A", None)),
            ("1", NewTransaction::new(f64::INFINITY, "A", None)),
            ("1", NewTransaction::new(1.0, "", None)),
            ("1", NewTransaction::new(1.0, "A", Some(0))),
            ("1", NewTransaction::new(1.0, "A", Some(-2))),
        ];
        for (raw_id, input) in cases {
            let err = ledger.insert(raw_id, input.clone(), far()).await.unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidArgument(_)),
                "{raw_id} {input:?} gave {err:?}"
            );
        }
        assert_eq!(ledger.store.count().await.unwrap(), 0);

        for raw_id in [" 1", "1 ", " 1 "] {
            let err = ledger
                .insert(raw_id, NewTransaction::new(1.0, "A", None), far())
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::InvalidArgument(_)), "{raw_id:?} gave {err:?}");
        }
        assert_eq!(ledger.store.count().await.unwrap(), 0);

        assert!(matches!(
            ledger.detail("x", far()).await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.sum("", far()).await,
            Err(LedgerError::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.ids_by_category("", far()).await,
            Err(LedgerError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn dangling_parent_is_accepted() {
        let ledger = memory_ledger();
        put(&ledger, "5", 3.0, "X", Some(999)).await;
        assert_eq!(ledger.detail("5", far()).await.unwrap().parent_id, Some(id(999)));
        assert_eq!(ledger.sum("5", far()).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn cycles_terminate_with_report() {
        let ledger = memory_ledger();
        put(&ledger, "1", 10.0, "A", Some(2)).await;
        put(&ledger, "2", 20.0, "A", Some(1)).await;

        assert_eq!(ledger.sum("1", far()).await.unwrap(), 30.0);
        let report = ledger.rollup("1", far()).await.unwrap();
        assert_eq!(report.included, vec![id(1), id(2)]);
        assert_eq!(report.cycle_nodes, vec![id(1)]);
    }

    #[tokio::test]
    async fn purge_by_id_and_category() {
        let ledger = memory_ledger();
        put(&ledger, "1", 1.0, "A", None).await;
        put(&ledger, "2", 2.0, "B", None).await;
        put(&ledger, "3", 3.0, "B", None).await;
        put(&ledger, "4", 4.0, "C", None).await;

        assert_eq!(ledger.purge("1", "B", far()).await.unwrap(), 3);
        assert!(ledger.ids_by_category("B", far()).await.unwrap().is_empty());
        assert!(matches!(
            ledger.detail("1", far()).await,
            Err(LedgerError::NotFound(_))
        ));

        assert_eq!(ledger.purge("4", "", far()).await.unwrap(), 1);
        assert_eq!(ledger.purge("4", "", far()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn healthy_memory_store() {
        assert_eq!(memory_ledger().health().await, Health::Healthy);
    }

    #[tokio::test]
    async fn deadline_helper_uses_config() {
        let ledger = Ledger::new(
            Arc::new(InMemoryLedgerStore::new()),
            LedgerConfig {
                insert_timeout_ms: 0,
                ..LedgerConfig::default()
            },
        );
        let err = ledger
            .insert("1", NewTransaction::new(1.0, "A", None), ledger.deadline(Operation::Insert))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Timeout(Operation::Insert)));
        assert_eq!(ledger.store.count().await.unwrap(), 0);
    }

    // ----------------------------------------------------------
    // Deadlines against a slow store
    // ----------------------------------------------------------

    /// Store double whose every call takes `delay` of (paused) time.
    struct SlowStore {
        inner: InMemoryLedgerStore,
        delay: Duration,
    }

    #[async_trait]
    impl LedgerStore for SlowStore {
        async fn insert(&self, tx: Transaction) -> StoreResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.insert(tx).await
        }
        async fn get(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
            tokio::time::sleep(self.delay).await;
            self.inner.get(id).await
        }
        async fn find_by_category(&self, category: &str) -> StoreResult<Vec<TransactionId>> {
            tokio::time::sleep(self.delay).await;
            self.inner.find_by_category(category).await
        }
        async fn children_of(&self, parent: TransactionId) -> StoreResult<Vec<Transaction>> {
            tokio::time::sleep(self.delay).await;
            self.inner.children_of(parent).await
        }
        async fn delete(&self, id: TransactionId, category: &str) -> StoreResult<usize> {
            tokio::time::sleep(self.delay).await;
            self.inner.delete(id, category).await
        }
        async fn ping(&self) -> StoreResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.ping().await
        }
        async fn count(&self) -> StoreResult<usize> {
            self.inner.count().await
        }
    }

    fn slow_ledger(delay: Duration) -> Ledger {
        let store = SlowStore {
            inner: InMemoryLedgerStore::new(),
            delay,
        };
        Ledger::new(Arc::new(store), LedgerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reads_time_out() {
        let ledger = slow_ledger(Duration::from_millis(200));
        put(&ledger, "1", 10.0, "A", None).await;

        let short = || Deadline::after(Duration::from_millis(50));
        assert!(matches!(
            ledger.detail("1", short()).await,
            Err(LedgerError::Timeout(Operation::Detail))
        ));
        assert!(matches!(
            ledger.ids_by_category("A", short()).await,
            Err(LedgerError::Timeout(Operation::ListByCategory))
        ));
        assert!(matches!(
            ledger.sum("1", short()).await,
            Err(LedgerError::Timeout(Operation::Sum))
        ));
        assert!(matches!(
            ledger.purge("1", "", short()).await,
            Err(LedgerError::Timeout(Operation::Purge))
        ));

        assert_eq!(ledger.detail("1", far()).await.unwrap().amount, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_insert_leaves_no_record() {
        let ledger = slow_ledger(Duration::from_millis(200));
        let err = ledger
            .insert(
                "1",
                NewTransaction::new(1.0, "A", None),
                Deadline::after(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Timeout(Operation::Insert)));
        assert!(matches!(
            ledger.detail("1", far()).await,
            Err(LedgerError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ping_is_unhealthy() {
        let ledger = slow_ledger(Duration::from_secs(30));
        assert_eq!(ledger.health().await, Health::Unhealthy);
    }

    // ----------------------------------------------------------
    // File-backed ledger
    // ----------------------------------------------------------

    #[tokio::test]
    async fn file_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileStoreConfig::in_dir(dir.path());

        {
            let store = FileLedgerStore::open(&config).unwrap();
            let ledger = Ledger::new(Arc::new(store), LedgerConfig::default());
            put(&ledger, "1", 10.0, "ANIMALS", None).await;
            put(&ledger, "2", 100.0, "ANIMALS", Some(1)).await;
            assert_eq!(ledger.health().await, Health::Healthy);
        }

        let store = FileLedgerStore::open(&config).unwrap();
        let ledger = Ledger::new(Arc::new(store), LedgerConfig::default());
        assert_eq!(ledger.sum("1", far()).await.unwrap(), 110.0);
        assert_eq!(
            ledger.ids_by_category("ANIMALS", far()).await.unwrap(),
            vec![id(1), id(2)]
        );
    }

    #[tokio::test]
    async fn file_ledger_unhealthy_without_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileStoreConfig::in_dir(dir.path());
        let store = FileLedgerStore::open(&config).unwrap();
        let ledger = Ledger::new(Arc::new(store), LedgerConfig::default());

        std::fs::remove_file(&config.path).unwrap();
        assert_eq!(ledger.health().await, Health::Unhealthy);
    }

    #[test]
    fn store_errors_surface_as_io() {
        let err: LedgerError = StoreError::Unavailable("gone".into()).into();
        assert!(matches!(err, LedgerError::Io(msg) if msg.contains("gone")));
    }

    #[test]
    fn new_transaction_json_shape() {
        let input: NewTransaction =
            serde_json::from_str(r#"{"amount": 5, "type": "CARS", "parent_id": 3}"#).unwrap();
        assert_eq!(input, NewTransaction::new(5.0, "CARS", Some(3)));
        let input: NewTransaction = serde_json::from_str(r#"{"amount": 5, "type": "CARS"}"#).unwrap();
        assert_eq!(input.parent_id, None);
    }

    // ----------------------------------------------------------
    // Properties
    // ----------------------------------------------------------

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn detail_returns_what_was_inserted(
            raw in 1i64..1_000_000,
            amount in 0.01f64..1e9,
            category in "[A-Z]{1,12}",
            parent in proptest::option::of(1i64..1_000_000),
        ) {
            let detail = runtime().block_on(async {
                let ledger = memory_ledger();
                ledger
                    .insert(&raw.to_string(), NewTransaction::new(amount, category.clone(), parent), far())
                    .await
                    .unwrap();
                ledger.detail(&raw.to_string(), far()).await.unwrap()
            });
            prop_assert_eq!(detail.amount, amount);
            prop_assert_eq!(detail.category, category);
            prop_assert_eq!(detail.parent_id.map(i64::from), parent);
        }

        #[test]
        fn non_positive_amounts_never_stored(amount in -1e9f64..=0.0) {
            let (result, count) = runtime().block_on(async {
                let ledger = memory_ledger();
                let result = ledger.insert("1", NewTransaction::new(amount, "A", None), far()).await;
                (result, ledger.store.count().await.unwrap())
            });
            prop_assert!(matches!(result, Err(LedgerError::InvalidArgument(_))));
            prop_assert_eq!(count, 0);
        }
    }
}
