use base64::Engine;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use url::Url;
use uuid::Uuid;

use crate::error::{Result, TableError};

use super::types::EnumType;

/// A model property value, as read from or written to a field descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    DateTimeOffset(DateTime<FixedOffset>),
    Double(f64),
    Guid(Uuid),
    Int32(i32),
    Int64(i64),
    String(String),
    Uri(Url),
    /// The underlying integer of an enumeration member.
    Enum(i32),
}

impl PropertyValue {
    /// Short name of the runtime shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Binary(_) => "Vec<u8>",
            PropertyValue::DateTime(_) => "DateTime<Utc>",
            PropertyValue::DateTimeOffset(_) => "DateTime<FixedOffset>",
            PropertyValue::Double(_) => "f64",
            PropertyValue::Guid(_) => "Uuid",
            PropertyValue::Int32(_) => "i32",
            PropertyValue::Int64(_) => "i64",
            PropertyValue::String(_) => "String",
            PropertyValue::Uri(_) => "Url",
            PropertyValue::Enum(_) => "enum",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Wraps an enumeration member.
    pub fn from_enum<E: StorableEnum>(value: E) -> Self {
        PropertyValue::Enum(value.to_i32())
    }

    /// Extracts an enumeration member.
    ///
    /// Integers that do not name a member of `E` are rejected here; the enum
    /// converter has already substituted a member before values reach a
    /// setter.
    pub fn into_enum<E: StorableEnum>(self) -> Result<E> {
        match self {
            PropertyValue::Enum(v) | PropertyValue::Int32(v) => E::from_i32(v).ok_or_else(|| {
                TableError::Conversion(format!("{v} is not a member of {}", E::TYPE.name))
            }),
            other => Err(mismatch(E::TYPE.name, &other)),
        }
    }

    /// Extracts an optional enumeration member.
    pub fn into_optional_enum<E: StorableEnum>(self) -> Result<Option<E>> {
        match self {
            PropertyValue::Null => Ok(None),
            other => other.into_enum().map(Some),
        }
    }
}

/// A Rust enum that can be stored through the enum converter.
///
/// `TYPE.members` and `from_i32` must agree: the converter substitutes the
/// first listed member for undefined integers, and that member has to
/// resolve through `from_i32`. [`StorableEnum::check_members`] verifies this
/// and belongs in the implementing crate's tests.
///
/// ```
/// use tablemap_core::value::{EnumType, StorableEnum};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Tier {
///     Free = 0,
///     Pro = 10,
/// }
///
/// impl StorableEnum for Tier {
///     const TYPE: EnumType = EnumType::new("Tier", &[0, 10]);
///
///     fn to_i32(self) -> i32 {
///         self as i32
///     }
///
///     fn from_i32(value: i32) -> Option<Self> {
///         match value {
///             0 => Some(Tier::Free),
///             10 => Some(Tier::Pro),
///             _ => None,
///         }
///     }
/// }
///
/// assert_eq!(Tier::TYPE.first_member(), Some(0));
/// assert!(Tier::check_members().is_ok());
/// ```
pub trait StorableEnum: Copy + Sized + 'static {
    const TYPE: EnumType;

    fn to_i32(self) -> i32;

    fn from_i32(value: i32) -> Option<Self>;

    /// Fails if a listed member does not resolve through `from_i32` back to
    /// the same integer.
    fn check_members() -> Result<()> {
        for &member in Self::TYPE.members {
            match Self::from_i32(member).map(Self::to_i32) {
                Some(v) if v == member => {}
                _ => {
                    return Err(TableError::Conversion(format!(
                        "{member} is listed for {} but does not resolve to a member",
                        Self::TYPE.name
                    )))
                }
            }
        }
        Ok(())
    }
}

fn mismatch(expected: &str, found: &PropertyValue) -> TableError {
    TableError::Conversion(format!(
        "expected {expected}, found {}",
        found.type_name()
    ))
}

macro_rules! property_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    PropertyValue::$variant(value)
                }
            }

            impl TryFrom<PropertyValue> for $ty {
                type Error = TableError;

                fn try_from(value: PropertyValue) -> Result<Self> {
                    match value {
                        PropertyValue::$variant(v) => Ok(v),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }

            impl TryFrom<PropertyValue> for Option<$ty> {
                type Error = TableError;

                fn try_from(value: PropertyValue) -> Result<Self> {
                    match value {
                        PropertyValue::Null => Ok(None),
                        PropertyValue::$variant(v) => Ok(Some(v)),
                        other => Err(mismatch(concat!("Option<", stringify!($ty), ">"), &other)),
                    }
                }
            }
        )*
    };
}

property_conversions! {
    Bool => bool,
    Binary => Vec<u8>,
    DateTime => DateTime<Utc>,
    DateTimeOffset => DateTime<FixedOffset>,
    Double => f64,
    Guid => Uuid,
    Int32 => i32,
    Int64 => i64,
    String => String,
    Uri => Url,
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropertyValue::Null, Into::into)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Null => serializer.serialize_none(),
            PropertyValue::Bool(v) => serializer.serialize_bool(*v),
            PropertyValue::Binary(v) => {
                serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(v))
            }
            PropertyValue::DateTime(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            PropertyValue::DateTimeOffset(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
            PropertyValue::Double(v) => serializer.serialize_f64(*v),
            PropertyValue::Guid(v) => serializer.collect_str(v),
            PropertyValue::Int32(v) | PropertyValue::Enum(v) => serializer.serialize_i32(*v),
            PropertyValue::Int64(v) => serializer.serialize_i64(*v),
            PropertyValue::String(v) => serializer.serialize_str(v),
            PropertyValue::Uri(v) => serializer.serialize_str(v.as_str()),
        }
    }
}
