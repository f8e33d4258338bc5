//! Reference-kind converters: binary, text and URI.
//!
//! Reference kinds match exactly their declared type (no `Nullable` form)
//! and pass null through unchanged.

use url::Url;

use crate::error::{Result, TableError};
use crate::value::{PropertyType, PropertyValue, StoredValue};

use super::{stored_mismatch, value_mismatch, Converter};

pub(super) const BINARY: Converter = Converter::new(
    "binary",
    &[PropertyType::Binary],
    |ty| matches!(ty, PropertyType::Binary),
    write_binary,
    read_binary,
);

pub(super) const STRING: Converter = Converter::new(
    "string",
    &[PropertyType::String],
    |ty| matches!(ty, PropertyType::String),
    write_string,
    read_string,
);

pub(super) const URI: Converter = Converter::new(
    "uri",
    &[PropertyType::Uri],
    |ty| matches!(ty, PropertyType::Uri),
    write_uri,
    read_uri,
);

fn read_binary(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
    match stored {
        StoredValue::Binary(Some(bytes)) => Ok(PropertyValue::Binary(bytes.clone())),
        StoredValue::Binary(None) => Ok(PropertyValue::Null),
        other => Err(stored_mismatch(target, other)),
    }
}

fn write_binary(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
    match value {
        PropertyValue::Binary(bytes) => Ok(StoredValue::Binary(Some(bytes.clone()))),
        PropertyValue::Null => Ok(StoredValue::Binary(None)),
        other => Err(value_mismatch(declared, other)),
    }
}

fn read_string(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
    match stored {
        StoredValue::String(Some(text)) => Ok(PropertyValue::String(text.clone())),
        StoredValue::String(None) => Ok(PropertyValue::Null),
        other => Err(stored_mismatch(target, other)),
    }
}

fn write_string(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
    match value {
        PropertyValue::String(text) => Ok(StoredValue::String(Some(text.clone()))),
        PropertyValue::Null => Ok(StoredValue::String(None)),
        other => Err(value_mismatch(declared, other)),
    }
}

fn read_uri(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
    match stored {
        StoredValue::String(Some(text)) if !text.trim().is_empty() => Url::parse(text)
            .map(PropertyValue::Uri)
            .map_err(|e| TableError::Conversion(format!("Invalid absolute URI {text:?}: {e}"))),
        StoredValue::String(_) => Ok(PropertyValue::Null),
        other => Err(stored_mismatch(target, other)),
    }
}

fn write_uri(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
    match value {
        PropertyValue::Uri(url) => Ok(StoredValue::String(Some(url.as_str().to_string()))),
        PropertyValue::Null => Ok(StoredValue::String(None)),
        other => Err(value_mismatch(declared, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConverterRegistry;

    #[test]
    fn test_binary_round_trip() {
        let registry = ConverterRegistry::with_defaults();
        for bytes in [vec![], vec![0u8, 255, 7]] {
            let stored = registry
                .convert_to_stored(&PropertyValue::Binary(bytes.clone()), &PropertyType::Binary)
                .unwrap();
            assert_eq!(stored, StoredValue::Binary(Some(bytes.clone())));
            assert_eq!(
                registry.convert_to_value(&stored, &PropertyType::Binary).unwrap(),
                PropertyValue::Binary(bytes)
            );
        }
    }

    #[test]
    fn test_reference_kinds_pass_null_through() {
        let registry = ConverterRegistry::with_defaults();
        for ty in [PropertyType::Binary, PropertyType::String] {
            let stored = registry.convert_to_stored(&PropertyValue::Null, &ty).unwrap();
            assert!(stored.is_null());
            assert_eq!(
                registry.convert_to_value(&stored, &ty).unwrap(),
                PropertyValue::Null
            );
        }
    }

    #[test]
    fn test_string_round_trip() {
        let registry = ConverterRegistry::with_defaults();
        for text in ["", "hello", "ünïcødé ✓"] {
            let value = PropertyValue::String(text.to_string());
            let stored = registry.convert_to_stored(&value, &PropertyType::String).unwrap();
            assert_eq!(
                registry.convert_to_value(&stored, &PropertyType::String).unwrap(),
                value
            );
        }
    }

    #[test]
    fn test_uri_null_round_trip() {
        let registry = ConverterRegistry::with_defaults();

        let stored = registry
            .convert_to_stored(&PropertyValue::Null, &PropertyType::Uri)
            .unwrap();
        assert_eq!(stored, StoredValue::String(None));
        assert_eq!(
            registry.convert_to_value(&stored, &PropertyType::Uri).unwrap(),
            PropertyValue::Null
        );
    }

    #[test]
    fn test_uri_text_unchanged() {
        let registry = ConverterRegistry::with_defaults();
        let text = "https://example.com/path/to?q=1#frag";

        let value = registry
            .convert_to_value(&StoredValue::String(Some(text.to_string())), &PropertyType::Uri)
            .unwrap();
        let stored = registry.convert_to_stored(&value, &PropertyType::Uri).unwrap();

        assert_eq!(stored, StoredValue::String(Some(text.to_string())));
    }

    #[test]
    fn test_uri_blank_text_reads_null() {
        let registry = ConverterRegistry::with_defaults();
        for text in ["", "   ", "\t"] {
            let value = registry
                .convert_to_value(&StoredValue::String(Some(text.to_string())), &PropertyType::Uri)
                .unwrap();
            assert_eq!(value, PropertyValue::Null);
        }
    }

    #[test]
    fn test_uri_relative_text_is_error() {
        let registry = ConverterRegistry::with_defaults();
        let result = registry.convert_to_value(
            &StoredValue::String(Some("/relative/path".to_string())),
            &PropertyType::Uri,
        );
        assert!(matches!(result, Err(TableError::Conversion(_))));
    }
}
