use thiserror::Error;

/// Failures reported by a [`TableStore`](crate::store::TableStore) implementation.
///
/// Stores classify every failure so the commit loop can decide between
/// retrying, translating, and propagating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Throttling, timeouts and other faults worth retrying.
    #[error("Transient storage failure: {0}")]
    Transient(String),
    /// The target row already exists.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Any other failure.
    #[error("Storage failure: {0}")]
    Fatal(String),
}

impl StoreError {
    /// Returns true if the failure may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Errors surfaced by the data-access layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Unsupported property type: {type_name}")]
    UnsupportedType { type_name: String },
    #[error("Value {value} is out of range for {type_name}")]
    ConversionRange { type_name: String, value: String },
    #[error("Conversion error: {0}")]
    Conversion(String),
    #[error("Entity not found in {table}: ({partition_key}, {row_key})")]
    EntityNotFound {
        table: String,
        partition_key: String,
        row_key: String,
    },
    #[error("Entity already exists in {table}: ({partition_key}, {row_key})")]
    EntityAlreadyExists {
        table: String,
        partition_key: String,
        row_key: String,
    },
    #[error("Storage operation failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_display() {
        let error = TableError::UnsupportedType {
            type_name: "u128".to_string(),
        };
        assert_eq!(error.to_string(), "Unsupported property type: u128");
    }

    #[test]
    fn test_entity_not_found_display() {
        let error = TableError::EntityNotFound {
            table: "customers".to_string(),
            partition_key: "eu".to_string(),
            row_key: "42".to_string(),
        };
        assert_eq!(error.to_string(), "Entity not found in customers: (eu, 42)");
    }

    #[test]
    fn test_entity_already_exists_display() {
        let error = TableError::EntityAlreadyExists {
            table: "orders".to_string(),
            partition_key: "2024".to_string(),
            row_key: "A-1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Entity already exists in orders: (2024, A-1)"
        );
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let error = TableError::from(StoreError::Fatal("malformed request".to_string()));
        assert_eq!(error.to_string(), "Storage failure: malformed request");
    }

    #[test]
    fn test_retries_exhausted_display() {
        let error = TableError::RetriesExhausted {
            attempts: 4,
            message: "throttled".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Storage operation failed after 4 attempts: throttled"
        );
    }

    #[test]
    fn test_only_transient_is_transient() {
        assert!(StoreError::Transient("timeout".to_string()).is_transient());
        assert!(!StoreError::Conflict("exists".to_string()).is_transient());
        assert!(!StoreError::Fatal("bad request".to_string()).is_transient());
    }
}
