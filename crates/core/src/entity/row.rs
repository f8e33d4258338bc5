use std::collections::BTreeMap;

use crate::convert::ConverterRegistry;
use crate::error::{Result, TableError};
use crate::value::StoredValue;

use super::{DynamicRecord, TableModel};

/// Property name reserved for the partition key.
pub const PARTITION_KEY: &str = "PartitionKey";

/// Property name reserved for the row key.
pub const ROW_KEY: &str = "RowKey";

/// Suffix reserved for the attribute carrying a property's stored kind.
pub const KIND_MARKER_SUFFIX: &str = "@type";

/// Rejects names a row cannot hold as properties: the two key names and
/// anything ending in [`KIND_MARKER_SUFFIX`].
pub fn check_property_name(name: &str) -> Result<()> {
    if name == PARTITION_KEY || name == ROW_KEY {
        return Err(TableError::Conversion(format!(
            "{name:?} is reserved for the row's key"
        )));
    }
    if name.ends_with(KIND_MARKER_SUFFIX) {
        return Err(TableError::Conversion(format!(
            "{name:?} ends with the reserved suffix {KIND_MARKER_SUFFIX:?}"
        )));
    }
    Ok(())
}

/// A generic table row: two string keys and properties ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    partition_key: String,
    row_key: String,
    properties: BTreeMap<String, StoredValue>,
}

impl Entity {
    /// Creates a row with no properties.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Creates a row from already-stored properties, as read from a store.
    pub fn from_parts(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        properties: BTreeMap<String, StoredValue>,
    ) -> Result<Self> {
        properties.keys().try_for_each(|name| check_property_name(name))?;
        Ok(Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties,
        })
    }

    /// Adds a property. Existing names are kept.
    pub fn with_property(mut self, name: impl Into<String>, value: StoredValue) -> Result<Self> {
        let name = name.into();
        check_property_name(&name)?;
        self.properties.entry(name).or_insert(value);
        Ok(self)
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn properties(&self) -> &BTreeMap<String, StoredValue> {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&StoredValue> {
        self.properties.get(name)
    }

    /// Builds a row from every descriptor field of `item`.
    ///
    /// Fields named like the reserved key properties are skipped, and a
    /// field ending in the kind marker suffix is an error. When two fields
    /// share a name the first one wins.
    pub fn hydrate<T: TableModel>(
        item: &T,
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        registry: &ConverterRegistry,
    ) -> Result<Self> {
        let mut entity = Self::new(partition_key, row_key);

        for field in T::fields() {
            if field.name() == PARTITION_KEY || field.name() == ROW_KEY {
                continue;
            }
            check_property_name(field.name())?;
            let stored = registry.convert_to_stored(&field.get(item), field.property_type())?;
            entity
                .properties
                .entry(field.name().to_string())
                .or_insert(stored);
        }

        Ok(entity)
    }

    /// Hydrates using the keys `item` reports.
    pub fn from_model<T: TableModel>(item: &T, registry: &ConverterRegistry) -> Result<Self> {
        Self::hydrate(item, item.partition_key(), item.row_key(), registry)
    }

    /// Projects the row into a new `T`.
    ///
    /// Stored properties without a matching field are dropped; fields without
    /// a stored property keep their default value.
    pub fn project<T: TableModel>(&self, registry: &ConverterRegistry) -> Result<T> {
        let mut item = T::default();
        item.set_keys(&self.partition_key, &self.row_key);

        for (name, stored) in &self.properties {
            match T::field(name) {
                Some(field) => {
                    let value = registry.convert_to_value(stored, field.property_type())?;
                    field.set(&mut item, value)?;
                }
                None => {
                    tracing::trace!(property = %name, "Dropping property with no matching field");
                }
            }
        }

        Ok(item)
    }

    /// Projects the row into a schema-less record.
    pub fn project_dynamic(&self) -> DynamicRecord {
        DynamicRecord::new(
            self.partition_key.clone(),
            self.row_key.clone(),
            self.properties.clone(),
        )
    }
}
