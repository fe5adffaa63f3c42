//! Error types for the wire protocol.

use std::io;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding, decoding or framing messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A message could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// A message body is not a valid encoding of the expected type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A frame header announced a body larger than allowed.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Announced body size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The peer closed the stream in the middle of a frame.
    #[error("connection closed mid-frame")]
    Truncated,

    /// I/O error on the underlying stream.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Returns true if the connection cannot be used after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::FrameTooLarge { .. } | ProtocolError::Truncated | ProtocolError::Io(_)
        )
    }
}
