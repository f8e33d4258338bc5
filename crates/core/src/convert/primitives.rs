//! Direct value-kind converters: boolean, double, guid, 32 and 64-bit integers.

use crate::error::Result;
use crate::value::{PropertyType, PropertyValue, StoredValue};

use super::{read_value, stored_mismatch, write_value, Converter};

macro_rules! value_converter {
    ($const_name:ident, $name:literal, $ty:ident, $read:ident, $write:ident) => {
        pub(super) const $const_name: Converter = Converter::new(
            $name,
            &[PropertyType::$ty, PropertyType::Nullable(&PropertyType::$ty)],
            |ty| matches!(ty.base(), PropertyType::$ty),
            $write,
            $read,
        );

        fn $read(stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
            match stored {
                StoredValue::$ty(payload) => read_value(*payload, target, PropertyValue::$ty),
                other => Err(stored_mismatch(target, other)),
            }
        }

        fn $write(value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
            write_value(
                value,
                declared,
                |v| match v {
                    PropertyValue::$ty(x) => Some(*x),
                    _ => None,
                },
                StoredValue::$ty,
            )
        }
    };
}

value_converter!(BOOL, "bool", Bool, read_bool, write_bool);
value_converter!(DOUBLE, "double", Double, read_double, write_double);
value_converter!(GUID, "guid", Guid, read_guid, write_guid);
value_converter!(INT32, "int32", Int32, read_int32, write_int32);
value_converter!(INT64, "int64", Int64, read_int64, write_int64);
