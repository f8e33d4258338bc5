use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::StoreError;

use super::{KeyFilter, OperationKind, ScanPage};

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A remote partitioned key-value table service.
///
/// Implementations are stateless request/response clients. They classify
/// failures into [`StoreError`] variants and never retry on their own.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetches one row by its exact keys.
    async fn retrieve(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> StoreResult<Option<Entity>>;

    /// Executes one write.
    ///
    /// `Insert` must fail with [`StoreError::Conflict`] when the row exists.
    async fn execute(&self, table: &str, kind: OperationKind, entity: &Entity) -> StoreResult<()>;

    /// Returns one page of rows matching `filter`, in key order.
    async fn scan(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&str>,
    ) -> StoreResult<ScanPage>;
}
