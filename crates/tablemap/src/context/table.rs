use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};

use tablemap_core::convert::ConverterRegistry;
use tablemap_core::entity::{DynamicRecord, Entity, TableModel};
use tablemap_core::retry::{ExponentialRetry, RetryPolicy};
use tablemap_core::store::{KeyFilter, OperationKind, PendingOperation, ScanPage, TableStore};
use tablemap_core::{Result, StoreError, TableError};

use super::queue::OperationQueue;
use crate::config::TableConfig;
use crate::retry::run_with_retry;

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Operations executed against the store.
    pub committed: usize,
}

/// Unit of work over one store.
///
/// Writes are queued and only reach the store on [`TableContext::commit`].
/// Reads go straight to the store and never observe queued writes. The
/// context is `Send + Sync`; any number of tasks may enqueue concurrently,
/// but only one should commit at a time.
pub struct TableContext {
    store: Arc<dyn TableStore>,
    registry: &'static ConverterRegistry,
    retry_policy: Arc<dyn RetryPolicy>,
    queue: OperationQueue,
}

impl std::fmt::Debug for TableContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableContext")
            .field("registry", &self.registry)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl TableContext {
    /// Creates a context with the default registry and retry policy.
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            registry: ConverterRegistry::global(),
            retry_policy: Arc::new(ExponentialRetry::default()),
            queue: OperationQueue::default(),
        }
    }

    /// Creates a context whose retry policy comes from `config`.
    pub fn from_config(store: Arc<dyn TableStore>, config: &TableConfig) -> Self {
        Self::new(store).with_retry_policy(config.retry_policy())
    }

    /// Replaces the converter registry.
    pub fn with_registry(mut self, registry: &'static ConverterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the retry policy used by reads and [`TableContext::commit`].
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    pub fn registry(&self) -> &'static ConverterRegistry {
        self.registry
    }

    /// Number of operations waiting for the next commit.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Queues an insert. Fails at commit if the row already exists.
    pub fn insert<T: TableModel>(&self, table: &str, item: &T) -> Result<()> {
        self.enqueue_model(table, OperationKind::Insert, item)
    }

    /// Queues an insert-or-replace.
    pub fn upsert<T: TableModel>(&self, table: &str, item: &T) -> Result<()> {
        self.enqueue_model(table, OperationKind::Upsert, item)
    }

    /// Queues a replace of an existing row.
    pub fn update<T: TableModel>(&self, table: &str, item: &T) -> Result<()> {
        self.enqueue_model(table, OperationKind::Replace, item)
    }

    /// Queues an already hydrated row.
    pub fn enqueue(&self, table: &str, kind: OperationKind, entity: Entity) {
        tracing::trace!(
            table,
            partition_key = entity.partition_key(),
            row_key = entity.row_key(),
            kind = %kind,
            "Queued operation"
        );
        self.queue.push(PendingOperation::new(table, kind, entity));
    }

    fn enqueue_model<T: TableModel>(&self, table: &str, kind: OperationKind, item: &T) -> Result<()> {
        let entity = Entity::from_model(item, self.registry)?;
        self.enqueue(table, kind, entity);
        Ok(())
    }

    /// Queues a delete of `item`'s row if it currently exists.
    ///
    /// Returns `false`, queueing nothing, when the row is absent.
    pub async fn delete<T: TableModel>(&self, table: &str, item: &T) -> Result<bool> {
        match self
            .retrieve(table, item.partition_key(), item.row_key())
            .await?
        {
            Some(entity) => {
                self.enqueue(table, OperationKind::Delete, entity);
                Ok(true)
            }
            None => {
                tracing::debug!(
                    table,
                    partition_key = item.partition_key(),
                    row_key = item.row_key(),
                    "Row already absent, nothing to delete"
                );
                Ok(false)
            }
        }
    }

    /// Queues a delete for every row currently matching `filter`.
    ///
    /// The member set is resolved now; rows written after this call are not
    /// affected. Returns the number of deletes queued.
    pub async fn delete_collection(&self, table: &str, filter: &KeyFilter) -> Result<usize> {
        let mut queued = 0;
        let mut continuation: Option<String> = None;

        loop {
            let page = self.scan_page(table, filter, continuation.as_deref()).await?;
            for entity in page.entities {
                self.enqueue(table, OperationKind::Delete, entity);
                queued += 1;
            }
            match page.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        tracing::debug!(table, filter = %filter, queued, "Queued collection delete");
        Ok(queued)
    }

    /// Executes every queued operation with the context's retry policy.
    pub async fn commit(&self) -> Result<CommitSummary> {
        let policy = Arc::clone(&self.retry_policy);
        self.commit_with(policy.as_ref()).await
    }

    /// Executes every queued operation in FIFO order.
    ///
    /// The queue is emptied up front. On the first failure that survives
    /// `policy` the remaining operations are discarded and the error is
    /// returned; operations already executed stay applied.
    pub async fn commit_with(&self, policy: &dyn RetryPolicy) -> Result<CommitSummary> {
        let batch = self.queue.take();
        tracing::debug!(operations = batch.len(), "Committing batch");

        let mut committed = 0;
        let mut operations = batch.into_iter();

        while let Some(op) = operations.next() {
            let result = run_with_retry(policy, op.kind.as_str(), || {
                self.store.execute(&op.table, op.kind, &op.entity)
            })
            .await;

            if let Err(err) = result {
                tracing::warn!(
                    table = %op.table,
                    partition_key = op.entity.partition_key(),
                    row_key = op.entity.row_key(),
                    kind = %op.kind,
                    committed,
                    discarded = operations.len(),
                    error = %err,
                    "Commit aborted, discarding remaining operations"
                );
                return Err(translate_failure(err, &op));
            }
            committed += 1;
        }

        tracing::debug!(committed, "Batch committed");
        Ok(CommitSummary { committed })
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Point read projected into `T`.
    pub async fn get<T: TableModel>(&self, table: &str, partition_key: &str, row_key: &str) -> Result<T> {
        self.get_entity(table, partition_key, row_key)
            .await?
            .project(self.registry)
    }

    /// Point read projected into a [`DynamicRecord`].
    pub async fn get_dynamic(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> Result<DynamicRecord> {
        Ok(self
            .get_entity(table, partition_key, row_key)
            .await?
            .project_dynamic())
    }

    /// Lazily streams every row matching `filter`, projected into `T`, in key
    /// order. Pages are fetched as the stream is polled.
    pub fn query<T: TableModel>(&self, table: &str, filter: KeyFilter) -> BoxStream<'_, Result<T>> {
        let registry = self.registry;
        self.scan_entities(table, filter)
            .map(move |entity| entity.and_then(|e| e.project::<T>(registry)))
            .boxed()
    }

    /// Same as [`TableContext::query`] with dynamic projection.
    pub fn query_dynamic(&self, table: &str, filter: KeyFilter) -> BoxStream<'_, Result<DynamicRecord>> {
        self.scan_entities(table, filter)
            .map(|entity| entity.map(|e| e.project_dynamic()))
            .boxed()
    }

    async fn get_entity(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Entity> {
        self.retrieve(table, partition_key, row_key)
            .await?
            .ok_or_else(|| TableError::EntityNotFound {
                table: table.to_string(),
                partition_key: partition_key.to_string(),
                row_key: row_key.to_string(),
            })
    }

    async fn retrieve(&self, table: &str, partition_key: &str, row_key: &str) -> Result<Option<Entity>> {
        run_with_retry(self.retry_policy.as_ref(), "retrieve", || {
            self.store.retrieve(table, partition_key, row_key)
        })
        .await
    }

    async fn scan_page(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&str>,
    ) -> Result<ScanPage> {
        run_with_retry(self.retry_policy.as_ref(), "scan", || {
            self.store.scan(table, filter, continuation)
        })
        .await
    }

    fn scan_entities(&self, table: &str, filter: KeyFilter) -> BoxStream<'_, Result<Entity>> {
        let table = table.to_string();

        Box::pin(async_stream::stream! {
            let mut continuation: Option<String> = None;
            loop {
                let page = match self.scan_page(&table, &filter, continuation.as_deref()).await {
                    Ok(page) => page,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                };
                tracing::trace!(
                    table = %table,
                    rows = page.entities.len(),
                    more = page.continuation.is_some(),
                    "Fetched scan page"
                );
                for entity in page.entities {
                    yield Ok(entity);
                }
                match page.continuation {
                    Some(token) => continuation = Some(token),
                    None => break,
                }
            }
        })
    }
}

/// Conflicts on insert become [`TableError::EntityAlreadyExists`]; everything
/// else is returned unchanged.
fn translate_failure(err: TableError, op: &PendingOperation) -> TableError {
    match err {
        TableError::Storage(StoreError::Conflict(_)) if op.kind == OperationKind::Insert => {
            TableError::EntityAlreadyExists {
                table: op.table.clone(),
                partition_key: op.entity.partition_key().to_string(),
                row_key: op.entity.row_key().to_string(),
            }
        }
        err => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;
    use std::time::Duration;

    use futures_util::TryStreamExt;
    use tablemap_core::entity::Field;
    use tablemap_core::retry::NoRetry;
    use tablemap_core::value::{PropertyType, PropertyValue, StoredValue};

    use crate::storage::InMemoryTableStore;

    const PEOPLE: &str = "people";

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        region: String,
        id: String,
        name: String,
        age: Option<i32>,
    }

    static PERSON_FIELDS: [Field<Person>; 2] = [
        Field::new(
            "Name",
            PropertyType::String,
            |p| p.name.clone().into(),
            |p, v| {
                p.name = v.try_into()?;
                Ok(())
            },
        ),
        Field::new(
            "Age",
            PropertyType::Nullable(&PropertyType::Int32),
            |p| p.age.into(),
            |p, v| {
                p.age = v.try_into()?;
                Ok(())
            },
        ),
    ];

    impl TableModel for Person {
        fn fields() -> &'static [Field<Self>] {
            &PERSON_FIELDS
        }

        fn partition_key(&self) -> &str {
            &self.region
        }

        fn row_key(&self) -> &str {
            &self.id
        }

        fn set_keys(&mut self, partition_key: &str, row_key: &str) {
            self.region = partition_key.to_string();
            self.id = row_key.to_string();
        }
    }

    fn person(region: &str, id: &str, name: &str) -> Person {
        Person {
            region: region.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            age: None,
        }
    }

    fn fast_retry(max_attempts: u32) -> ExponentialRetry {
        ExponentialRetry::new(max_attempts, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn context(store: &InMemoryTableStore) -> TableContext {
        TableContext::new(Arc::new(store.clone())).with_retry_policy(fast_retry(3))
    }

    async fn seed(store: &InMemoryTableStore, people: &[Person]) {
        let ctx = context(store);
        for p in people {
            ctx.insert(PEOPLE, p).unwrap();
        }
        ctx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_writes_are_deferred_until_commit() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);

        ctx.insert(PEOPLE, &person("eu", "1", "Ada")).unwrap();
        ctx.upsert(PEOPLE, &person("eu", "2", "Grace")).unwrap();

        assert_eq!(ctx.pending(), 2);
        assert_eq!(store.len(PEOPLE).await, 0);

        let summary = ctx.commit().await.unwrap();

        assert_eq!(summary, CommitSummary { committed: 2 });
        assert_eq!(ctx.pending(), 0);
        assert_eq!(store.len(PEOPLE).await, 2);
    }

    #[tokio::test]
    async fn test_upsert_and_update_overwrite_committed_rows() {
        let store = InMemoryTableStore::new();
        seed(&store, &[person("eu", "1", "Ada"), person("eu", "2", "Grace")]).await;
        let ctx = context(&store);

        ctx.upsert(PEOPLE, &person("eu", "1", "Ada Lovelace")).unwrap();
        ctx.update(PEOPLE, &person("eu", "2", "Grace Hopper")).unwrap();
        ctx.upsert(PEOPLE, &person("eu", "3", "Barbara")).unwrap();
        let summary = ctx.commit().await.unwrap();

        assert_eq!(summary, CommitSummary { committed: 3 });
        let names: Vec<String> = ctx
            .query::<Person>(PEOPLE, KeyFilter::partition("eu"))
            .map_ok(|p| p.name)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper", "Barbara"]);
    }

    #[tokio::test]
    async fn test_reads_do_not_observe_queued_writes() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);
        ctx.insert(PEOPLE, &person("eu", "1", "Ada")).unwrap();

        let result = ctx.get::<Person>(PEOPLE, "eu", "1").await;

        assert_eq!(
            result,
            Err(TableError::EntityNotFound {
                table: PEOPLE.to_string(),
                partition_key: "eu".to_string(),
                row_key: "1".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_failure_discards_rest_of_batch() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);

        ctx.insert(PEOPLE, &person("eu", "a", "A")).unwrap();
        // Replacing a row that does not exist fails fatally.
        ctx.update(PEOPLE, &person("eu", "b", "B")).unwrap();
        ctx.insert(PEOPLE, &person("eu", "c", "C")).unwrap();

        let result = ctx.commit().await;

        assert!(matches!(result, Err(TableError::Storage(StoreError::Fatal(_)))));
        assert_eq!(ctx.pending(), 0);
        let keys: Vec<_> = store
            .rows(PEOPLE)
            .await
            .iter()
            .map(|e| e.row_key().to_string())
            .collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[tokio::test]
    async fn test_insert_conflict_becomes_already_exists() {
        let store = InMemoryTableStore::new();
        seed(&store, &[person("eu", "1", "Ada")]).await;
        let ctx = context(&store);

        ctx.insert(PEOPLE, &person("eu", "1", "Impostor")).unwrap();
        let result = ctx.commit().await;

        assert_eq!(
            result,
            Err(TableError::EntityAlreadyExists {
                table: PEOPLE.to_string(),
                partition_key: "eu".to_string(),
                row_key: "1".to_string(),
            })
        );
        let stored: Person = ctx.get(PEOPLE, "eu", "1").await.unwrap();
        assert_eq!(stored.name, "Ada");
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);
        ctx.insert(PEOPLE, &person("eu", "1", "Ada")).unwrap();

        store
            .fail_next(StoreError::Transient("throttled".to_string()))
            .await;
        store
            .fail_next(StoreError::Transient("throttled".to_string()))
            .await;

        let summary = ctx.commit_with(&fast_retry(3)).await.unwrap();

        assert_eq!(summary.committed, 1);
        assert_eq!(store.len(PEOPLE).await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_abort_commit() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);
        ctx.insert(PEOPLE, &person("eu", "1", "Ada")).unwrap();
        ctx.insert(PEOPLE, &person("eu", "2", "Grace")).unwrap();

        for _ in 0..2 {
            store
                .fail_next(StoreError::Transient("unavailable".to_string()))
                .await;
        }

        let result = ctx.commit_with(&fast_retry(2)).await;

        assert!(matches!(
            result,
            Err(TableError::RetriesExhausted { attempts: 2, .. })
        ));
        assert_eq!(store.len(PEOPLE).await, 0);
        assert_eq!(ctx.pending(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_a_no_op() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);

        let deleted = ctx.delete(PEOPLE, &person("eu", "404", "")).await.unwrap();

        assert!(!deleted);
        assert_eq!(ctx.pending(), 0);
    }

    #[tokio::test]
    async fn test_delete_existing_row() {
        let store = InMemoryTableStore::new();
        seed(&store, &[person("eu", "1", "Ada")]).await;
        let ctx = context(&store);

        let deleted = ctx.delete(PEOPLE, &person("eu", "1", "")).await.unwrap();
        assert!(deleted);
        assert_eq!(ctx.pending(), 1);

        ctx.commit().await.unwrap();
        assert_eq!(store.len(PEOPLE).await, 0);
    }

    #[tokio::test]
    async fn test_delete_collection_resolves_members_now() {
        let store = InMemoryTableStore::new().with_page_size(2);
        seed(
            &store,
            &[
                person("eu", "1", "A"),
                person("eu", "2", "B"),
                person("eu", "3", "C"),
                person("us", "1", "D"),
            ],
        )
        .await;
        let ctx = context(&store);

        let queued = ctx
            .delete_collection(PEOPLE, &KeyFilter::partition("eu"))
            .await
            .unwrap();
        assert_eq!(queued, 3);

        ctx.commit().await.unwrap();
        let remaining: Vec<_> = store
            .rows(PEOPLE)
            .await
            .iter()
            .map(|e| e.partition_key().to_string())
            .collect();
        assert_eq!(remaining, vec!["us"]);
    }

    #[tokio::test]
    async fn test_range_query_across_pages() {
        let store = InMemoryTableStore::new().with_page_size(2);
        let people: Vec<Person> = ["100", "150", "199", "200", "099"]
            .iter()
            .map(|id| person("eu", id, id))
            .collect();
        seed(&store, &people).await;
        seed(&store, &[person("us", "150", "other")]).await;
        let ctx = context(&store);

        let found: Vec<Person> = ctx
            .query(PEOPLE, KeyFilter::partition("eu").with_row_range("100", "199"))
            .try_collect()
            .await
            .unwrap();

        let ids: Vec<_> = found.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["100", "150", "199"]);
        assert!(found.iter().all(|p| p.region == "eu"));
    }

    #[tokio::test]
    async fn test_empty_query_is_not_an_error() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);

        let found: Vec<DynamicRecord> = ctx
            .query_dynamic(PEOPLE, KeyFilter::all())
            .try_collect()
            .await
            .unwrap();

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_get_dynamic_reports_stored_values() {
        let store = InMemoryTableStore::new();
        let mut ada = person("eu", "1", "Ada");
        ada.age = Some(36);
        seed(&store, &[ada]).await;
        let ctx = context(&store);

        let record = ctx.get_dynamic(PEOPLE, "eu", "1").await.unwrap();

        assert_eq!(record.get("Name"), Some(PropertyValue::String("Ada".to_string())));
        assert_eq!(record.get("Age"), Some(PropertyValue::Int32(36)));
    }

    #[tokio::test]
    async fn test_get_retries_transient_read() {
        let store = InMemoryTableStore::new();
        seed(&store, &[person("eu", "1", "Ada")]).await;
        let ctx = context(&store);
        store
            .fail_next(StoreError::Transient("timeout".to_string()))
            .await;

        let found: Person = ctx.get(PEOPLE, "eu", "1").await.unwrap();

        assert_eq!(found.name, "Ada");
    }

    #[tokio::test]
    async fn test_no_retry_policy_escalates_read_failure() {
        let store = InMemoryTableStore::new();
        let ctx = TableContext::new(Arc::new(store.clone())).with_retry_policy(NoRetry);
        store
            .fail_next(StoreError::Transient("timeout".to_string()))
            .await;

        let result = ctx.get_dynamic(PEOPLE, "eu", "1").await;

        assert!(matches!(
            result,
            Err(TableError::RetriesExhausted { attempts: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_conversion_errors_surface_when_queueing() {
        static EMPTY: LazyLock<ConverterRegistry> = LazyLock::new(ConverterRegistry::new);
        let store = InMemoryTableStore::new();
        let ctx = context(&store).with_registry(&EMPTY);

        let result = ctx.insert(PEOPLE, &person("eu", "1", "Ada"));

        assert_eq!(
            result,
            Err(TableError::UnsupportedType {
                type_name: "String".to_string()
            })
        );
        assert_eq!(ctx.pending(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_raw_entity() {
        let store = InMemoryTableStore::new();
        let ctx = context(&store);
        let entity = Entity::new("eu", "9")
            .with_property("Legacy", StoredValue::Int64(Some(7)))
            .unwrap();

        ctx.enqueue(PEOPLE, OperationKind::Upsert, entity);
        ctx.commit().await.unwrap();

        let projected: Person = ctx.get(PEOPLE, "eu", "9").await.unwrap();
        assert_eq!(projected.id, "9");
        assert_eq!(projected.name, "");
    }

    #[tokio::test]
    async fn test_concurrent_enqueue() {
        let store = InMemoryTableStore::new();
        let ctx = Arc::new(context(&store));

        let mut handles = Vec::new();
        for worker in 0..8 {
            let ctx = Arc::clone(&ctx);
            handles.push(tokio::spawn(async move {
                for n in 0..25 {
                    let id = format!("{worker:02}-{n:02}");
                    ctx.upsert(PEOPLE, &person("eu", &id, "x")).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(ctx.pending(), 200);
        let summary = ctx.commit().await.unwrap();
        assert_eq!(summary.committed, 200);
        assert_eq!(store.len(PEOPLE).await, 200);
    }
}
