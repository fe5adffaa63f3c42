//! Error types for the device registry.

use crate::types::DeviceId;
use thiserror::Error;

/// Result type for value validation and catalog construction.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while validating caller-supplied values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Device identifier is missing or not a UUID.
    #[error("invalid device id: {message}")]
    InvalidDeviceId {
        /// Why the identifier was rejected.
        message: String,
    },

    /// Device type ordinal is outside the known enumeration.
    #[error("incorrect device type: {value}")]
    InvalidDeviceType {
        /// The rejected ordinal.
        value: i32,
    },

    /// Battery level outside 0..=100.
    #[error("incorrect battery state: {value}")]
    InvalidBattery {
        /// The rejected level.
        value: i32,
    },

    /// Feature catalog is malformed.
    #[error("invalid feature catalog: {message}")]
    InvalidCatalog {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid device id error.
    pub fn invalid_device_id(message: impl Into<String>) -> Self {
        Self::InvalidDeviceId {
            message: message.into(),
        }
    }

    /// Creates an invalid catalog error.
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }
}

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No device is registered under this identifier.
    #[error("device not found: {device_id}")]
    NotFound {
        /// The identifier that was looked up.
        device_id: DeviceId,
    },

    /// The device is registered but has never reported a status.
    #[error("no status reported yet for device {device_id}")]
    NoStatus {
        /// The identifier that was looked up.
        device_id: DeviceId,
    },

    /// Feature name is not part of the catalog.
    #[error("unknown feature: {name}")]
    UnknownFeature {
        /// The rejected feature name.
        name: String,
    },

    /// A storage constraint (CHECK, UNIQUE, FOREIGN KEY) rejected a write.
    #[error("constraint violation: {message}")]
    Constraint {
        /// Backend description of the violation.
        message: String,
    },

    /// A persisted row could not be decoded.
    #[error("corrupt row: {message}")]
    Corrupt {
        /// Description of the bad value.
        message: String,
    },

    /// Any other SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    /// Creates a corrupt-row error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    /// Returns true if the error means the looked-up entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. } | StoreError::NoStatus { .. } | StoreError::UnknownFeature { .. }
        )
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            StoreError::Constraint {
                message: err.to_string(),
            }
        } else {
            StoreError::Sqlite(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let id = DeviceId::new_v4();
        assert!(StoreError::NotFound { device_id: id }.is_not_found());
        assert!(StoreError::NoStatus { device_id: id }.is_not_found());
        assert!(StoreError::UnknownFeature {
            name: "gps".into()
        }
        .is_not_found());
        assert!(!StoreError::corrupt("bad uuid").is_not_found());
    }

    #[test]
    fn error_display() {
        let err = CoreError::InvalidBattery { value: 101 };
        assert!(err.to_string().contains("101"));

        let err = StoreError::UnknownFeature {
            name: "gps".into(),
        };
        assert_eq!(err.to_string(), "unknown feature: gps");
    }

    #[test]
    fn constraint_mapping() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER CHECK (v BETWEEN 0 AND 100));")
            .unwrap();
        let err: StoreError = conn
            .execute("INSERT INTO t (v) VALUES (101)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Constraint { .. }));
    }
}
