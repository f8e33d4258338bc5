//! Enumerated types, stored through the 32-bit integer representation.

use crate::error::Result;
use crate::value::{EnumType, PropertyType, PropertyValue, StoredValue};

use super::{read_value, stored_mismatch, value_mismatch, Converter};

pub(super) const ENUM: Converter = Converter::new(
    "enum",
    // Accepts every enumeration, so there is no fixed list.
    &[],
    |ty| matches!(ty.base(), PropertyType::Enum(_)),
    write_enum,
    read_enum,
);

fn enum_type(ty: &PropertyType) -> Option<&EnumType> {
    match ty.base() {
        PropertyType::Enum(e) => Some(e),
        _ => None,
    }
}

fn read_enum(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
    let payload = match stored {
        StoredValue::Int32(payload) => *payload,
        other => return Err(stored_mismatch(target, other)),
    };
    let Some(raw) = payload else {
        return read_value(None, target, PropertyValue::Enum);
    };

    let Some(enumeration) = enum_type(target) else {
        return Ok(PropertyValue::Enum(raw));
    };

    if enumeration.is_defined(raw) {
        return Ok(PropertyValue::Enum(raw));
    }

    // Undefined integers become the first declared member (or zero for an
    // enumeration without members) instead of failing the read.
    let substitute = enumeration.first_member().unwrap_or(0);
    tracing::warn!(
        enumeration = enumeration.name,
        stored = raw,
        substitute,
        "Stored value is not a member of the enumeration"
    );
    Ok(PropertyValue::Enum(substitute))
}

fn write_enum(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
    match value {
        PropertyValue::Enum(v) | PropertyValue::Int32(v) => Ok(StoredValue::Int32(Some(*v))),
        PropertyValue::Null if declared.is_nullable() => Ok(StoredValue::Int32(None)),
        other => Err(value_mismatch(declared, other)),
    }
}
