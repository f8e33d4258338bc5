use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::value::{PropertyValue, StoredKind, StoredValue};

use super::{PARTITION_KEY, ROW_KEY};

/// A row projected without a compile-time schema.
///
/// Every property keeps its stored kind as a runtime tag; values are exposed
/// as their natural [`PropertyValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    partition_key: String,
    row_key: String,
    properties: BTreeMap<String, StoredValue>,
}

impl DynamicRecord {
    pub fn new(
        partition_key: String,
        row_key: String,
        properties: BTreeMap<String, StoredValue>,
    ) -> Self {
        Self {
            partition_key,
            row_key,
            properties,
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.properties.get(name).map(StoredValue::to_native)
    }

    /// The stored kind of a property.
    pub fn kind(&self, name: &str) -> Option<StoredKind> {
        self.properties.get(name).map(StoredValue::kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Property names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Serialize for DynamicRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.properties.len() + 2))?;
        map.serialize_entry(PARTITION_KEY, &self.partition_key)?;
        map.serialize_entry(ROW_KEY, &self.row_key)?;
        for (name, value) in &self.properties {
            map.serialize_entry(name, &value.to_native())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DynamicRecord {
        let mut properties = BTreeMap::new();
        properties.insert("Count".to_string(), StoredValue::Int32(Some(3)));
        properties.insert("Note".to_string(), StoredValue::String(None));
        DynamicRecord::new("p1".to_string(), "r1".to_string(), properties)
    }

    #[test]
    fn test_runtime_tags() {
        let record = sample();

        assert_eq!(record.kind("Count"), Some(StoredKind::Int32));
        assert_eq!(record.kind("Note"), Some(StoredKind::String));
        assert_eq!(record.get("Note"), Some(PropertyValue::Null));
        assert_eq!(record.get("Missing"), None);
        assert!(!record.contains("Missing"));
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["Count", "Note"]);
    }

    #[test]
    fn test_serialize_includes_keys() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "PartitionKey": "p1",
                "RowKey": "r1",
                "Count": 3,
                "Note": null,
            })
        );
    }
}
