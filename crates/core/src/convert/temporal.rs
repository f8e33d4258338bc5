//! UTC instant and offset instant converters.
//!
//! The store cannot represent instants before 1601-01-01T00:00:00Z. UTC
//! instants below that floor are written as RFC 3339 text and recovered from
//! text on read. Offset instants below the floor are rejected.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{Result, TableError};
use crate::value::{PropertyType, PropertyValue, StoredValue};

use super::{read_value, stored_mismatch, write_value, Converter};

/// Unix timestamp of 1601-01-01T00:00:00Z, the earliest typed instant the store accepts.
pub const MIN_STORABLE_TIMESTAMP: i64 = -11_644_473_600;

/// Returns true if `value` precedes the store's minimum supported instant.
pub fn is_below_storable_floor<Tz: TimeZone>(value: &DateTime<Tz>) -> bool {
    value.timestamp() < MIN_STORABLE_TIMESTAMP
}

pub(super) const DATE_TIME: Converter = Converter::new(
    "datetime",
    &[
        PropertyType::DateTime,
        PropertyType::Nullable(&PropertyType::DateTime),
    ],
    |ty| matches!(ty.base(), PropertyType::DateTime),
    write_date_time,
    read_date_time,
);

pub(super) const DATE_TIME_OFFSET: Converter = Converter::new(
    "datetime_offset",
    &[
        PropertyType::DateTimeOffset,
        PropertyType::Nullable(&PropertyType::DateTimeOffset),
    ],
    |ty| matches!(ty.base(), PropertyType::DateTimeOffset),
    write_date_time_offset,
    read_date_time_offset,
);

fn read_date_time(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
    match stored {
        StoredValue::DateTime(payload) => read_value(*payload, target, PropertyValue::DateTime),
        // Text escape hatch for instants written below the floor.
        StoredValue::String(Some(text)) => parse_instant(text).map(PropertyValue::DateTime),
        StoredValue::String(None) => read_value(None, target, PropertyValue::DateTime),
        other => Err(stored_mismatch(target, other)),
    }
}

fn write_date_time(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
    match value {
        PropertyValue::DateTime(v) if is_below_storable_floor(v) => Ok(StoredValue::String(Some(
            v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))),
        _ => write_value(
            value,
            declared,
            |v| match v {
                PropertyValue::DateTime(x) => Some(*x),
                _ => None,
            },
            StoredValue::DateTime,
        ),
    }
}

fn read_date_time_offset(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
    match stored {
        StoredValue::DateTime(payload) => read_value(
            payload.map(|v| v.fixed_offset()),
            target,
            PropertyValue::DateTimeOffset,
        ),
        other => Err(stored_mismatch(target, other)),
    }
}

fn write_date_time_offset(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
    if let PropertyValue::DateTimeOffset(v) = value {
        if is_below_storable_floor(v) {
            return Err(TableError::ConversionRange {
                type_name: declared.to_string(),
                value: v.to_rfc3339(),
            });
        }
    }

    write_value(
        value,
        declared,
        |v| match v {
            PropertyValue::DateTimeOffset(x) => Some(x.with_timezone(&Utc)),
            _ => None,
        },
        StoredValue::DateTime,
    )
}

fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TableError::Conversion(format!("Invalid datetime text {text:?}: {e}")))
}
