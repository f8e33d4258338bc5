//! Row representation and model descriptors.

mod dynamic;
mod model;
mod row;

pub use dynamic::DynamicRecord;
pub use model::{Field, TableModel};
pub use row::{check_property_name, Entity, KIND_MARKER_SUFFIX, PARTITION_KEY, ROW_KEY};
