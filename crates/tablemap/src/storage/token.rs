//! Continuation tokens shared by the store backends.

use serde::{Deserialize, Serialize};

use tablemap_core::store::StoreResult;
use tablemap_core::StoreError;

/// The last key a scan page returned, encoded as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,
    #[serde(rename = "RowKey")]
    pub row_key: String,
}

impl ContinuationToken {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }

    pub fn encode(&self) -> StoreResult<String> {
        serde_json::to_string(self)
            .map_err(|e| StoreError::Fatal(format!("Failed to encode continuation token: {}", e)))
    }

    pub fn decode(token: &str) -> StoreResult<Self> {
        serde_json::from_str(token)
            .map_err(|e| StoreError::Fatal(format!("Invalid continuation token: {}", e)))
    }
}
