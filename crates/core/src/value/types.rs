use std::fmt;

/// An enumerated type known to the converter registry.
///
/// `members` holds the integer value of every declared member in
/// declaration order. The first entry is the fallback used when a stored
/// integer does not name a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumType {
    pub name: &'static str,
    pub members: &'static [i32],
}

impl EnumType {
    /// Creates an enumeration descriptor.
    pub const fn new(name: &'static str, members: &'static [i32]) -> Self {
        Self { name, members }
    }

    /// Returns true if `value` is one of the declared members.
    pub fn is_defined(&self, value: i32) -> bool {
        self.members.contains(&value)
    }

    /// The first declared member, if the enumeration has any.
    pub fn first_member(&self) -> Option<i32> {
        self.members.first().copied()
    }
}

/// The declared type of a model property.
///
/// The variants are `Copy` and const-constructible so field descriptors can
/// live in `static` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Bool,
    Binary,
    DateTime,
    DateTimeOffset,
    Double,
    Guid,
    Int32,
    Int64,
    String,
    Uri,
    Enum(EnumType),
    /// The optional form of a value type, e.g. `Option<i32>`.
    Nullable(&'static PropertyType),
    /// A declared type with no storable representation.
    Other(&'static str),
}

impl PropertyType {
    /// Returns true for the `Nullable` wrapper.
    pub fn is_nullable(&self) -> bool {
        matches!(self, PropertyType::Nullable(_))
    }

    /// The wrapped type for `Nullable`, otherwise `self`.
    pub fn base(&self) -> &PropertyType {
        match self {
            PropertyType::Nullable(inner) => *inner,
            other => other,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Bool => f.write_str("bool"),
            PropertyType::Binary => f.write_str("Vec<u8>"),
            PropertyType::DateTime => f.write_str("DateTime<Utc>"),
            PropertyType::DateTimeOffset => f.write_str("DateTime<FixedOffset>"),
            PropertyType::Double => f.write_str("f64"),
            PropertyType::Guid => f.write_str("Uuid"),
            PropertyType::Int32 => f.write_str("i32"),
            PropertyType::Int64 => f.write_str("i64"),
            PropertyType::String => f.write_str("String"),
            PropertyType::Uri => f.write_str("Url"),
            PropertyType::Enum(e) => f.write_str(e.name),
            PropertyType::Nullable(inner) => write!(f, "Option<{inner}>"),
            PropertyType::Other(name) => f.write_str(name),
        }
    }
}
