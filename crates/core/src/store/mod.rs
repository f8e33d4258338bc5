//! The boundary to the remote table service.

mod traits;
mod types;

pub use traits::{StoreResult, TableStore};
pub use types::{KeyFilter, KeyRange, OperationKind, PendingOperation, ScanPage};
