//! In-memory table store.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use tablemap_core::entity::Entity;
use tablemap_core::store::{KeyFilter, OperationKind, ScanPage, StoreResult, TableStore};
use tablemap_core::StoreError;

use crate::storage::token::ContinuationToken;

type RowKey = (String, String);
type Table = BTreeMap<RowKey, Entity>;

/// Default number of rows per scan page.
pub const DEFAULT_PAGE_SIZE: usize = 1_000;

/// In-memory storage backend for tests and local development.
///
/// Tables are created on first write. Rows are kept in key order so scans
/// return them the way a partitioned store would. Data is lost when the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryTableStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    failures: Arc<Mutex<VecDeque<StoreError>>>,
    page_size: usize,
}

impl Default for InMemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTableStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(Mutex::new(VecDeque::new())),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the maximum number of rows per scan page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Makes the next store call fail with `error`.
    ///
    /// Calls queue up: each scripted failure is consumed by exactly one call.
    pub async fn fail_next(&self, error: StoreError) {
        self.failures.lock().await.push_back(error);
    }

    /// Number of rows in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, BTreeMap::len)
    }

    /// All rows of `table` in key order.
    pub async fn rows(&self, table: &str) -> Vec<Entity> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn scripted_failure(&self) -> StoreResult<()> {
        match self.failures.lock().await.pop_front() {
            Some(err) => {
                tracing::trace!(error = %err, "Injecting scripted failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

fn row_key(entity: &Entity) -> RowKey {
    (
        entity.partition_key().to_string(),
        entity.row_key().to_string(),
    )
}

fn describe(table: &str, key: &RowKey) -> String {
    format!("({}, {}) in {}", key.0, key.1, table)
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn retrieve(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> StoreResult<Option<Entity>> {
        self.scripted_failure().await?;

        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(&(partition_key.to_string(), row_key.to_string())))
            .cloned())
    }

    async fn execute(&self, table: &str, kind: OperationKind, entity: &Entity) -> StoreResult<()> {
        self.scripted_failure().await?;

        let key = row_key(entity);
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        match kind {
            OperationKind::Insert => {
                if rows.contains_key(&key) {
                    return Err(StoreError::Conflict(format!(
                        "{} already exists",
                        describe(table, &key)
                    )));
                }
                rows.insert(key.clone(), entity.clone());
            }
            OperationKind::Upsert => {
                rows.insert(key.clone(), entity.clone());
            }
            OperationKind::Replace => match rows.get_mut(&key) {
                Some(existing) => *existing = entity.clone(),
                None => {
                    return Err(StoreError::Fatal(format!(
                        "{} does not exist",
                        describe(table, &key)
                    )))
                }
            },
            OperationKind::Delete => {
                if rows.remove(&key).is_none() {
                    return Err(StoreError::Fatal(format!(
                        "{} does not exist",
                        describe(table, &key)
                    )));
                }
            }
        }

        tracing::trace!(
            table,
            partition_key = %key.0,
            row_key = %key.1,
            kind = %kind,
            "Executed operation"
        );
        Ok(())
    }

    async fn scan(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&str>,
    ) -> StoreResult<ScanPage> {
        self.scripted_failure().await?;

        let start = match continuation {
            Some(token) => {
                let token = ContinuationToken::decode(token)?;
                Bound::Excluded((token.partition_key, token.row_key))
            }
            None => Bound::Unbounded,
        };

        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(ScanPage::default());
        };

        let mut entities: Vec<Entity> = rows
            .range((start, Bound::Unbounded))
            .filter(|((pk, rk), _)| filter.matches(pk, rk))
            .take(self.page_size + 1)
            .map(|(_, entity)| entity.clone())
            .collect();

        let continuation = if entities.len() > self.page_size {
            entities.truncate(self.page_size);
            match entities.last() {
                Some(last) => Some(ContinuationToken::new(last.partition_key(), last.row_key()).encode()?),
                None => None,
            }
        } else {
            None
        };

        Ok(ScanPage {
            entities,
            continuation,
        })
    }
}
