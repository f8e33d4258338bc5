//! DynamoDB table store implementation.

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;

use tablemap_core::entity::Entity;
use tablemap_core::store::{KeyFilter, OperationKind, ScanPage, StoreResult, TableStore};

use super::conversions::{entity_to_item, item_to_entity, key_item, key_to_token, token_to_key};
use super::error::{
    map_delete_item_error, map_get_item_error, map_put_item_error, map_query_error, map_scan_error,
};
use super::expressions::{filter_expression, is_unsatisfiable, key_condition};
use crate::config::TableConfig;
use crate::storage::inmemory::DEFAULT_PAGE_SIZE;

const ROW_EXISTS: &str = "attribute_exists(PartitionKey)";
const ROW_ABSENT: &str = "attribute_not_exists(PartitionKey)";

/// Creates a DynamoDB client with the given configuration.
pub async fn create_client(config: &TableConfig) -> Client {
    let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
    }

    let sdk_config = sdk_config_loader.load().await;
    Client::new(&sdk_config)
}

/// DynamoDB-backed store.
///
/// Each table must have a string hash key `PartitionKey` and a string range
/// key `RowKey`.
#[derive(Debug, Clone)]
pub struct DynamoDbTableStore {
    client: Client,
    page_size: i32,
}

impl DynamoDbTableStore {
    /// Creates a store with the given DynamoDB client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE as i32,
        }
    }

    /// Creates a store from configuration, using the AWS default credential chain.
    pub async fn from_config(config: &TableConfig) -> Self {
        tracing::debug!(target_store = %config.target_display(), "Connecting to DynamoDB");
        Self::new(create_client(config).await).with_page_size(config.page_size)
    }

    /// Sets the `Limit` sent with each Query or Scan.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = i32::try_from(page_size.max(1)).unwrap_or(i32::MAX);
        self
    }

    async fn put(&self, table: &str, kind: OperationKind, entity: &Entity) -> StoreResult<()> {
        let condition = match kind {
            OperationKind::Insert => Some(ROW_ABSENT),
            OperationKind::Replace => Some(ROW_EXISTS),
            _ => None,
        };

        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(entity_to_item(entity)))
            .set_condition_expression(condition.map(str::to_string))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, kind, &describe(table, entity)))?;

        Ok(())
    }

    async fn delete(&self, table: &str, entity: &Entity) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(key_item(entity.partition_key(), entity.row_key())))
            .condition_expression(ROW_EXISTS)
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, &describe(table, entity)))?;

        Ok(())
    }
}

fn describe(table: &str, entity: &Entity) -> String {
    format!("({}, {}) in {}", entity.partition_key(), entity.row_key(), table)
}

#[async_trait]
impl TableStore for DynamoDbTableStore {
    async fn retrieve(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
    ) -> StoreResult<Option<Entity>> {
        let result = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key_item(partition_key, row_key)))
            .send()
            .await
            .map_err(map_get_item_error)?;

        match result.item {
            Some(item) => Ok(Some(item_to_entity(&item)?)),
            None => Ok(None),
        }
    }

    async fn execute(&self, table: &str, kind: OperationKind, entity: &Entity) -> StoreResult<()> {
        match kind {
            OperationKind::Delete => self.delete(table, entity).await,
            _ => self.put(table, kind, entity).await,
        }
    }

    async fn scan(
        &self,
        table: &str,
        filter: &KeyFilter,
        continuation: Option<&str>,
    ) -> StoreResult<ScanPage> {
        if is_unsatisfiable(filter) {
            return Ok(ScanPage::default());
        }

        let start_key = continuation.map(token_to_key).transpose()?;

        // A fixed partition is a Query, which returns rows in row key order.
        let (items, last_key) = match key_condition(filter) {
            Some(condition) => {
                let result = self
                    .client
                    .query()
                    .table_name(table)
                    .key_condition_expression(condition.text)
                    .set_expression_attribute_names(Some(condition.names))
                    .set_expression_attribute_values(Some(condition.values))
                    .set_exclusive_start_key(start_key)
                    .limit(self.page_size)
                    .send()
                    .await
                    .map_err(map_query_error)?;
                (result.items.unwrap_or_default(), result.last_evaluated_key)
            }
            None => {
                let mut request = self
                    .client
                    .scan()
                    .table_name(table)
                    .set_exclusive_start_key(start_key)
                    .limit(self.page_size);
                if let Some(expression) = filter_expression(filter) {
                    request = request
                        .filter_expression(expression.text)
                        .set_expression_attribute_names(Some(expression.names))
                        .set_expression_attribute_values(Some(expression.values));
                }
                let result = request.send().await.map_err(map_scan_error)?;
                (result.items.unwrap_or_default(), result.last_evaluated_key)
            }
        };

        let entities = items
            .iter()
            .map(item_to_entity)
            .collect::<StoreResult<Vec<_>>>()?;
        let continuation = last_key.as_ref().map(key_to_token).transpose()?;

        tracing::trace!(
            table,
            filter = %filter,
            rows = entities.len(),
            more = continuation.is_some(),
            "Fetched DynamoDB page"
        );

        Ok(ScanPage {
            entities,
            continuation,
        })
    }
}
