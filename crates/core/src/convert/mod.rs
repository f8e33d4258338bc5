//! Property-level type conversion.
//!
//! A [`ConverterRegistry`] is a capability table: each [`Converter`] entry
//! pairs a type-membership predicate with two pure functions that move a
//! [`PropertyValue`] to and from a [`StoredValue`]. Resolution is a linear
//! scan, first match wins. The supported type sets of the default entries are
//! disjoint, so the order only matters for converters registered by callers.

mod enumeration;
mod primitives;
mod reference;
mod temporal;

use std::sync::OnceLock;

use crate::error::{Result, TableError};
use crate::value::{PropertyType, PropertyValue, StoredValue};

pub use temporal::{is_below_storable_floor, MIN_STORABLE_TIMESTAMP};

type ToStored = fn(&PropertyValue, &PropertyType) -> Result<StoredValue>;
type FromStored = fn(&StoredValue, &PropertyType) -> Result<PropertyValue>;

/// One entry of the capability table.
#[derive(Clone, Copy)]
pub struct Converter {
    name: &'static str,
    supported_types: &'static [PropertyType],
    supports: fn(&PropertyType) -> bool,
    to_stored: ToStored,
    from_stored: FromStored,
}

impl Converter {
    pub const fn new(
        name: &'static str,
        supported_types: &'static [PropertyType],
        supports: fn(&PropertyType) -> bool,
        to_stored: ToStored,
        from_stored: FromStored,
    ) -> Self {
        Self {
            name,
            supported_types,
            supports,
            to_stored,
            from_stored,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type-membership test.
    pub fn can_convert(&self, ty: &PropertyType) -> bool {
        (self.supports)(ty)
    }

    /// The concrete types this converter lists. Parameterized entries such as
    /// the enum converter accept more than they list.
    pub fn supported_types(&self) -> &'static [PropertyType] {
        self.supported_types
    }

    pub fn to_stored(&self, value: &PropertyValue, declared: &PropertyType) -> Result<StoredValue> {
        (self.to_stored)(value, declared)
    }

    pub fn from_stored(&self, stored: &StoredValue, target: &PropertyType) -> Result<PropertyValue> {
        (self.from_stored)(stored, target)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter").field("name", &self.name).finish()
    }
}

/// Ordered set of converters.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Converter>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in converters.
    pub fn with_defaults() -> Self {
        Self {
            converters: vec![
                enumeration::ENUM,
                primitives::BOOL,
                reference::BINARY,
                temporal::DATE_TIME,
                temporal::DATE_TIME_OFFSET,
                primitives::DOUBLE,
                primitives::GUID,
                primitives::INT32,
                primitives::INT64,
                reference::STRING,
                reference::URI,
            ],
        }
    }

    /// The process-wide registry of built-in converters.
    pub fn global() -> &'static ConverterRegistry {
        static GLOBAL: OnceLock<ConverterRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ConverterRegistry::with_defaults)
    }

    /// Appends a converter. Entries registered earlier take precedence.
    pub fn register(&mut self, converter: Converter) -> &mut Self {
        self.converters.push(converter);
        self
    }

    /// Finds the first converter accepting `ty`.
    pub fn resolve(&self, ty: &PropertyType) -> Result<&Converter> {
        self.converters
            .iter()
            .find(|c| c.can_convert(ty))
            .ok_or_else(|| TableError::UnsupportedType {
                type_name: ty.to_string(),
            })
    }

    pub fn can_convert(&self, ty: &PropertyType) -> bool {
        self.resolve(ty).is_ok()
    }

    /// Converts an application value declared as `declared` into its stored form.
    pub fn convert_to_stored(
        &self,
        value: &PropertyValue,
        declared: &PropertyType,
    ) -> Result<StoredValue> {
        self.resolve(declared)?.to_stored(value, declared)
    }

    /// Converts a stored value into a value assignable to a `target` property.
    pub fn convert_to_value(
        &self,
        stored: &StoredValue,
        target: &PropertyType,
    ) -> Result<PropertyValue> {
        self.resolve(target)?.from_stored(stored, target)
    }

    /// Every concrete type listed by the registered converters.
    pub fn supported_types(&self) -> Vec<PropertyType> {
        self.converters
            .iter()
            .flat_map(|c| c.supported_types().iter().copied())
            .collect()
    }
}

// ============================================================================
// Shared value-kind / reference-kind helpers
// ============================================================================

/// Reads a value-kind payload, honouring the nullable form of `target`.
fn read_value<T>(
    payload: Option<T>,
    target: &PropertyType,
    wrap: fn(T) -> PropertyValue,
) -> Result<PropertyValue> {
    match payload {
        Some(v) => Ok(wrap(v)),
        None if target.is_nullable() => Ok(PropertyValue::Null),
        None => Err(TableError::Conversion(format!(
            "stored value is absent for non-nullable {target}"
        ))),
    }
}

/// Writes a value-kind payload, honouring the nullable form of `declared`.
fn write_value<T>(
    value: &PropertyValue,
    declared: &PropertyType,
    extract: fn(&PropertyValue) -> Option<T>,
    store: fn(Option<T>) -> StoredValue,
) -> Result<StoredValue> {
    match value {
        PropertyValue::Null if declared.is_nullable() => Ok(store(None)),
        PropertyValue::Null => Err(TableError::Conversion(format!(
            "null is not a valid {declared}"
        ))),
        other => extract(other)
            .map(|v| store(Some(v)))
            .ok_or_else(|| value_mismatch(declared, other)),
    }
}

fn value_mismatch(declared: &PropertyType, found: &PropertyValue) -> TableError {
    TableError::Conversion(format!(
        "expected a {declared} value, found {}",
        found.type_name()
    ))
}

fn stored_mismatch(target: &PropertyType, found: &StoredValue) -> TableError {
    TableError::Conversion(format!(
        "cannot read {target} from a stored {} value",
        found.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{EnumType, StoredKind};

    #[test]
    fn test_unsupported_type_names_the_type() {
        let registry = ConverterRegistry::with_defaults();
        let result = registry.convert_to_stored(&PropertyValue::Int64(1), &PropertyType::Other("u128"));

        assert_eq!(
            result,
            Err(TableError::UnsupportedType {
                type_name: "u128".to_string()
            })
        );
    }

    #[test]
    fn test_nullable_reference_kind_is_unsupported() {
        let registry = ConverterRegistry::with_defaults();
        let ty = PropertyType::Nullable(&PropertyType::String);

        assert!(!registry.can_convert(&ty));
        assert!(matches!(
            registry.resolve(&ty),
            Err(TableError::UnsupportedType { type_name }) if type_name == "Option<String>"
        ));
    }

    #[test]
    fn test_enum_resolves_before_int32() {
        let registry = ConverterRegistry::with_defaults();
        let ty = PropertyType::Enum(EnumType::new("Color", &[0, 1]));

        assert_eq!(registry.resolve(&ty).unwrap().name(), "enum");
        assert_eq!(registry.resolve(&PropertyType::Int32).unwrap().name(), "int32");
    }

    #[test]
    fn test_value_kinds_accept_nullable_form() {
        let registry = ConverterRegistry::with_defaults();
        let pairs: [(PropertyType, PropertyType); 4] = [
            (PropertyType::Bool, PropertyType::Nullable(&PropertyType::Bool)),
            (PropertyType::Guid, PropertyType::Nullable(&PropertyType::Guid)),
            (PropertyType::Int64, PropertyType::Nullable(&PropertyType::Int64)),
            (
                PropertyType::DateTimeOffset,
                PropertyType::Nullable(&PropertyType::DateTimeOffset),
            ),
        ];

        for (base, nullable) in pairs {
            assert_eq!(
                registry.resolve(&base).unwrap().name(),
                registry.resolve(&nullable).unwrap().name()
            );
        }
    }

    #[test]
    fn test_supported_types_are_resolvable() {
        let registry = ConverterRegistry::with_defaults();
        let types = registry.supported_types();

        assert!(types.contains(&PropertyType::Uri));
        assert!(types.contains(&PropertyType::Nullable(&PropertyType::Guid)));
        for ty in types {
            assert!(registry.can_convert(&ty), "{ty} should resolve");
        }
    }

    #[test]
    fn test_stored_values_survive_a_read_write_cycle() {
        use chrono::{TimeZone, Utc};
        use uuid::Uuid;

        const NULLABLE_BOOL: PropertyType = PropertyType::Nullable(&PropertyType::Bool);
        const NULLABLE_DATE_TIME: PropertyType = PropertyType::Nullable(&PropertyType::DateTime);
        const NULLABLE_DOUBLE: PropertyType = PropertyType::Nullable(&PropertyType::Double);
        const NULLABLE_GUID: PropertyType = PropertyType::Nullable(&PropertyType::Guid);
        const NULLABLE_INT32: PropertyType = PropertyType::Nullable(&PropertyType::Int32);
        const NULLABLE_INT64: PropertyType = PropertyType::Nullable(&PropertyType::Int64);

        let registry = ConverterRegistry::with_defaults();
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();

        let cases = [
            (StoredValue::Bool(Some(false)), PropertyType::Bool),
            (StoredValue::Bool(None), NULLABLE_BOOL),
            (StoredValue::Binary(Some(vec![0, 127, 255])), PropertyType::Binary),
            (StoredValue::Binary(None), PropertyType::Binary),
            (StoredValue::DateTime(Some(instant)), PropertyType::DateTime),
            (StoredValue::DateTime(None), NULLABLE_DATE_TIME),
            // Instants below the floor are kept as text.
            (
                StoredValue::String(Some("1500-03-01T12:00:00Z".to_string())),
                PropertyType::DateTime,
            ),
            (StoredValue::Double(Some(-0.125)), PropertyType::Double),
            (StoredValue::Double(None), NULLABLE_DOUBLE),
            (StoredValue::Guid(Some(id)), PropertyType::Guid),
            (StoredValue::Guid(None), NULLABLE_GUID),
            (StoredValue::Int32(Some(i32::MIN)), PropertyType::Int32),
            (StoredValue::Int32(None), NULLABLE_INT32),
            (StoredValue::Int64(Some(i64::MAX)), PropertyType::Int64),
            (StoredValue::Int64(None), NULLABLE_INT64),
            (StoredValue::String(Some("text".to_string())), PropertyType::String),
            (StoredValue::String(None), PropertyType::String),
        ];

        for (stored, ty) in cases {
            let value = registry.convert_to_value(&stored, &ty).unwrap();
            let back = registry.convert_to_stored(&value, &ty).unwrap();
            assert_eq!(back, stored, "{ty} did not survive");
        }
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        let registry = ConverterRegistry::new();
        assert!(!registry.can_convert(&PropertyType::Bool));
    }

    #[test]
    fn test_registered_converter_extends_registry() {
        fn supports(ty: &PropertyType) -> bool {
            matches!(ty, PropertyType::Other("u16"))
        }
        fn to_stored(value: &PropertyValue, _: &PropertyType) -> Result<StoredValue> {
            match value {
                PropertyValue::Int32(v) => Ok(StoredValue::Int32(Some(*v))),
                _ => Ok(StoredKind::Int32.null()),
            }
        }
        fn from_stored(stored: &StoredValue, _: &PropertyType) -> Result<PropertyValue> {
            match stored {
                StoredValue::Int32(Some(v)) => Ok(PropertyValue::Int32(*v)),
                _ => Ok(PropertyValue::Null),
            }
        }

        let mut registry = ConverterRegistry::with_defaults();
        registry.register(Converter::new("u16", &[], supports, to_stored, from_stored));

        let stored = registry
            .convert_to_stored(&PropertyValue::Int32(7), &PropertyType::Other("u16"))
            .unwrap();
        assert_eq!(stored, StoredValue::Int32(Some(7)));
    }

    #[test]
    fn test_global_registry_is_shared() {
        let a = ConverterRegistry::global() as *const ConverterRegistry;
        let b = ConverterRegistry::global() as *const ConverterRegistry;
        assert_eq!(a, b);
    }
}
