//! DynamoDB storage backend implementation.
//!
//! This module provides a DynamoDB-based implementation of
//! [`TableStore`](tablemap_core::store::TableStore) using `aws-sdk-dynamodb`.

mod conversions;
mod error;
mod expressions;
mod store;

pub use conversions::TYPE_SUFFIX;
pub use store::{create_client, DynamoDbTableStore};
