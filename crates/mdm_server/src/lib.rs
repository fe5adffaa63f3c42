//! # MDM Server
//!
//! Device management server.
//!
//! This crate provides:
//! - The management service used by device agents (register, ping, state fetch)
//! - The control service used by operators (queries and feature changes)
//! - Request dispatch with status-code mapping
//! - A TCP server speaking the length-prefixed CBOR protocol
//!
//! # Architecture
//!
//! Both services share one [`DeviceRegistry`] and one dirty tracker.
//! Operator feature changes are routed through the management service so
//! that every change marks the device as having a pending configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use mdm_server::{MdmServer, ServerConfig};
//! use std::sync::Arc;
//!
//! let config = ServerConfig::default().with_storage_path("mdm.db");
//! let server = Arc::new(MdmServer::new(config)?);
//! server.serve().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod control;
mod error;
mod handler;
mod management;
mod registry;
mod server;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use control::ControlService;
pub use error::{ServerError, ServerResult, ServiceError, ServiceResult};
pub use handler::RequestHandler;
pub use management::{FeatureMutator, ManagementService};
pub use registry::DeviceRegistry;
pub use server::MdmServer;
