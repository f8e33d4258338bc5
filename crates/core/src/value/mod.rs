//! Property values, declared property types and stored primitive kinds.

mod property;
mod stored;
mod types;

pub use property::{PropertyValue, StorableEnum};
pub use stored::{StoredKind, StoredValue};
pub use types::{EnumType, PropertyType};
