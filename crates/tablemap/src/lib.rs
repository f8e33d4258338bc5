//! Map typed records onto rows of a partitioned table store.
//!
//! `tablemap` is the imperative shell over [`tablemap_core`]: a
//! [`TableContext`] that queues writes and commits them in order, retry
//! execution, environment configuration, and the store backends.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tablemap::storage::InMemoryTableStore;
//! use tablemap::{KeyFilter, TableConfig, TableContext};
//!
//! # async fn run() -> tablemap::Result<()> {
//! let config = TableConfig::from_env()?;
//! let ctx = TableContext::from_config(Arc::new(InMemoryTableStore::new()), &config);
//!
//! let removed = ctx.delete_collection("sessions", &KeyFilter::partition("expired")).await?;
//! ctx.commit().await?;
//! println!("removed {removed} sessions");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod retry;
pub mod storage;

pub use config::TableConfig;
pub use context::{CommitSummary, TableContext};
pub use retry::run_with_retry;

pub use tablemap_core::convert::ConverterRegistry;
pub use tablemap_core::entity::{DynamicRecord, Entity, Field, TableModel};
pub use tablemap_core::retry::{ExponentialRetry, NoRetry, RetryPolicy};
pub use tablemap_core::store::{KeyFilter, KeyRange, OperationKind, TableStore};
pub use tablemap_core::value::{PropertyType, PropertyValue, StorableEnum};
pub use tablemap_core::{Result, StoreError, TableError};
