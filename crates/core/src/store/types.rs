use std::fmt;

use crate::entity::{Entity, PARTITION_KEY, ROW_KEY};

/// The write operations a store executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Fails with a conflict if the row exists.
    Insert,
    /// Insert-or-replace.
    Upsert,
    /// Replaces an existing row.
    Replace,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Upsert => "upsert",
            OperationKind::Replace => "replace",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued write against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub table: String,
    pub kind: OperationKind,
    pub entity: Entity,
}

impl PendingOperation {
    pub fn new(table: impl Into<String>, kind: OperationKind, entity: Entity) -> Self {
        Self {
            table: table.into(),
            kind,
            entity,
        }
    }
}

/// Inclusive range over one key. Equality is a range whose bounds coincide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Option<String>,
    pub upper: Option<String>,
}

impl KeyRange {
    /// Matches every key.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn exact(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
        }
    }

    pub fn between(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }

    pub fn at_least(lower: impl Into<String>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: None,
        }
    }

    pub fn at_most(upper: impl Into<String>) -> Self {
        Self {
            lower: None,
            upper: Some(upper.into()),
        }
    }

    /// Lexicographic, inclusive containment.
    pub fn contains(&self, key: &str) -> bool {
        self.lower.as_deref().is_none_or(|lower| key >= lower)
            && self.upper.as_deref().is_none_or(|upper| key <= upper)
    }

    /// The key when both bounds are equal.
    pub fn as_exact(&self) -> Option<&str> {
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) if lower == upper => Some(lower.as_str()),
            _ => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    fn write_predicate(&self, f: &mut fmt::Formatter<'_>, key: &str, first: &mut bool) -> fmt::Result {
        let mut clause = |f: &mut fmt::Formatter, op: &str, value: &str| {
            if !*first {
                f.write_str(" and ")?;
            }
            *first = false;
            write!(f, "{key} {op} '{value}'")
        };

        if let Some(key_value) = self.as_exact() {
            return clause(f, "eq", key_value);
        }
        if let Some(lower) = &self.lower {
            clause(f, "ge", lower)?;
        }
        if let Some(upper) = &self.upper {
            clause(f, "le", upper)?;
        }
        Ok(())
    }
}

/// Conjunction of a partition-key range and a row-key range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    pub partition: KeyRange,
    pub row: KeyRange,
}

impl KeyFilter {
    /// Matches every row of the table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every row of one partition.
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition: KeyRange::exact(partition_key),
            row: KeyRange::any(),
        }
    }

    /// Rows whose partition key lies in `[lower, upper]`.
    pub fn partition_range(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            partition: KeyRange::between(lower, upper),
            row: KeyRange::any(),
        }
    }

    /// Restricts the row key to `[lower, upper]`.
    pub fn with_row_range(mut self, lower: impl Into<String>, upper: impl Into<String>) -> Self {
        self.row = KeyRange::between(lower, upper);
        self
    }

    pub fn with_row(mut self, row_key: impl Into<String>) -> Self {
        self.row = KeyRange::exact(row_key);
        self
    }

    pub fn matches(&self, partition_key: &str, row_key: &str) -> bool {
        self.partition.contains(partition_key) && self.row.contains(row_key)
    }
}

impl fmt::Display for KeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.partition.is_unbounded() && self.row.is_unbounded() {
            return f.write_str("*");
        }
        let mut first = true;
        self.partition.write_predicate(f, PARTITION_KEY, &mut first)?;
        self.row.write_predicate(f, ROW_KEY, &mut first)
    }
}

/// One page of a filtered scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub entities: Vec<Entity>,
    /// Opaque token for the next page; `None` on the last page.
    pub continuation: Option<String>,
}
