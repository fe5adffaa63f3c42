//! Error types for the MDM services and server.

use mdm_core::{CoreError, StoreError};
use mdm_protocol::ProtocolError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type for server lifecycle operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned by the management and control services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A caller-supplied value was rejected before touching the store.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced device or feature does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_not_found() {
            ServiceError::NotFound(err.to_string())
        } else {
            ServiceError::Store(err)
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Errors that stop the server from starting or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// The store could not be opened.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Wire protocol failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
