//! Error types for the device agent and transports.

use mdm_protocol::{ProtocolError, Status};
use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while talking to the MDM server.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Network failure.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// Framing or encoding failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server answered with a failure status.
    #[error("server rejected request: {0}")]
    Rejected(Status),

    /// The server answered with the wrong response kind.
    #[error("unexpected response to {expected}")]
    UnexpectedResponse {
        /// RPC whose response was expected.
        expected: &'static str,
    },

    /// The server did not answer in time.
    #[error("operation timed out")]
    Timeout,
}

impl AgentError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        Self::Transport {
            message: message.into(),
            retryable,
        }
    }

    /// Returns true if repeating the call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Transport { retryable, .. } => *retryable,
            AgentError::Timeout => true,
            AgentError::Rejected(status) => !status.code.is_client_error(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::transport(err.to_string(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(AgentError::Timeout.is_retryable());
        assert!(AgentError::transport("reset", true).is_retryable());
        assert!(!AgentError::transport("bad address", false).is_retryable());
        assert!(AgentError::Rejected(Status::internal("db down")).is_retryable());
        assert!(!AgentError::Rejected(Status::invalid_argument("battery")).is_retryable());
        assert!(!AgentError::Config("missing".into()).is_retryable());
    }
}
