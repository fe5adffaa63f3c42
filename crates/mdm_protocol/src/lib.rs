//! # MDM Protocol
//!
//! Wire protocol between the MDM server, device agents and operators.
//!
//! This crate provides:
//! - One request/response pair per RPC
//! - Status codes for failed calls
//! - CBOR encoding of message bodies
//! - Length-prefixed framing over async streams
//!
//! ## Protocol
//!
//! Agents drive configuration by pulling:
//! 1. `DeviceRegister` once at startup (idempotent)
//! 2. `DevicePing` periodically; the reply says whether configuration changed
//! 3. `DeviceState` after a ping that reported a change
//!
//! Operators read the registry and change features; a change is picked up
//! by the device at its next ping.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod codec;
mod error;
mod frame;
mod messages;
mod status;

pub use codec::{decode, encode};
pub use error::{ProtocolError, ProtocolResult};
pub use frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_SIZE};
pub use messages::*;
pub use status::{Status, StatusCode};
