//! Functional core of tablemap.
//!
//! Maps typed application records onto rows of a schemaless, partitioned
//! table store. Everything here is pure: conversions, row hydration and
//! projection, key filters, and the traits the imperative shell implements.

pub mod convert;
pub mod entity;
pub mod error;
pub mod retry;
pub mod store;
pub mod value;

pub use error::{Result, StoreError, TableError};
