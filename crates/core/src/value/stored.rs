use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PropertyValue;

/// The eight primitive kinds the table store persists natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredKind {
    Bool,
    Binary,
    DateTime,
    Double,
    Guid,
    Int32,
    Int64,
    String,
}

impl StoredKind {
    pub const ALL: [StoredKind; 8] = [
        StoredKind::Bool,
        StoredKind::Binary,
        StoredKind::DateTime,
        StoredKind::Double,
        StoredKind::Guid,
        StoredKind::Int32,
        StoredKind::Int64,
        StoredKind::String,
    ];

    /// The wire name of the kind, used as the persisted type marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredKind::Bool => "Boolean",
            StoredKind::Binary => "Binary",
            StoredKind::DateTime => "DateTime",
            StoredKind::Double => "Double",
            StoredKind::Guid => "Guid",
            StoredKind::Int32 => "Int32",
            StoredKind::Int64 => "Int64",
            StoredKind::String => "String",
        }
    }

    /// Parses a persisted type marker.
    pub fn parse(marker: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == marker)
    }

    /// An empty value of this kind.
    pub fn null(self) -> StoredValue {
        match self {
            StoredKind::Bool => StoredValue::Bool(None),
            StoredKind::Binary => StoredValue::Binary(None),
            StoredKind::DateTime => StoredValue::DateTime(None),
            StoredKind::Double => StoredValue::Double(None),
            StoredKind::Guid => StoredValue::Guid(None),
            StoredKind::Int32 => StoredValue::Int32(None),
            StoredKind::Int64 => StoredValue::Int64(None),
            StoredKind::String => StoredValue::String(None),
        }
    }
}

impl fmt::Display for StoredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value as persisted in a row.
///
/// `None` payloads are nulls that keep their kind, which is how a nullable
/// value type or a null reference is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Bool(Option<bool>),
    Binary(Option<Vec<u8>>),
    DateTime(Option<DateTime<Utc>>),
    Double(Option<f64>),
    Guid(Option<Uuid>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    String(Option<String>),
}

impl StoredValue {
    pub fn kind(&self) -> StoredKind {
        match self {
            StoredValue::Bool(_) => StoredKind::Bool,
            StoredValue::Binary(_) => StoredKind::Binary,
            StoredValue::DateTime(_) => StoredKind::DateTime,
            StoredValue::Double(_) => StoredKind::Double,
            StoredValue::Guid(_) => StoredKind::Guid,
            StoredValue::Int32(_) => StoredKind::Int32,
            StoredValue::Int64(_) => StoredKind::Int64,
            StoredValue::String(_) => StoredKind::String,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            StoredValue::Bool(v) => v.is_none(),
            StoredValue::Binary(v) => v.is_none(),
            StoredValue::DateTime(v) => v.is_none(),
            StoredValue::Double(v) => v.is_none(),
            StoredValue::Guid(v) => v.is_none(),
            StoredValue::Int32(v) => v.is_none(),
            StoredValue::Int64(v) => v.is_none(),
            StoredValue::String(v) => v.is_none(),
        }
    }

    /// The payload as its natural application value, with no declared type.
    pub fn to_native(&self) -> PropertyValue {
        match self {
            StoredValue::Bool(v) => v.map(PropertyValue::Bool).into(),
            StoredValue::Binary(v) => v.clone().map(PropertyValue::Binary).into(),
            StoredValue::DateTime(v) => v.map(PropertyValue::DateTime).into(),
            StoredValue::Double(v) => v.map(PropertyValue::Double).into(),
            StoredValue::Guid(v) => v.map(PropertyValue::Guid).into(),
            StoredValue::Int32(v) => v.map(PropertyValue::Int32).into(),
            StoredValue::Int64(v) => v.map(PropertyValue::Int64).into(),
            StoredValue::String(v) => v.clone().map(PropertyValue::String).into(),
        }
    }
}
