//! Storage backend implementations.
//!
//! This module provides concrete implementations of the
//! [`TableStore`](tablemap_core::store::TableStore) trait. The in-memory
//! backend is always available; DynamoDB is selected via feature flag.
//!
//! # Feature Flags
//!
//! - `dynamodb`: AWS DynamoDB storage backend using `aws-sdk-dynamodb`
//!
//! # Examples
//!
//! Build with DynamoDB:
//! ```bash
//! cargo build -p tablemap --features dynamodb
//! ```

pub mod inmemory;
mod token;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

pub use inmemory::InMemoryTableStore;
pub use token::ContinuationToken;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbTableStore;
