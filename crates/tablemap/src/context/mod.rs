//! Unit-of-work context over a table store.
//!
//! Provides `TableContext`, which queues writes across many tables and
//! commits them in order, and serves reads straight from the store.

mod queue;
mod table;

pub use table::{CommitSummary, TableContext};
