//! In-memory storage backend.

mod store;

pub use store::{InMemoryTableStore, DEFAULT_PAGE_SIZE};
