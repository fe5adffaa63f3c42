//! # MDM Agent
//!
//! Device-side agent for the MDM server.
//!
//! This crate provides:
//! - An agent that registers, pings and pulls configuration changes
//! - A transport abstraction with TCP and in-process implementations
//! - Agent configuration
//!
//! The TCP transport doubles as the RPC client used by operator tooling:
//! any [`mdm_protocol::Request`] can be sent through [`AgentTransport::call`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mdm_agent::{AgentConfig, DeviceAgent, TcpTransport};
//!
//! let config = AgentConfig::from_file(path)?;
//! let transport = TcpTransport::new(config.server_addr.clone())
//!     .with_timeout(config.request_timeout);
//! let mut agent = DeviceAgent::new(config, transport);
//! agent.run(tokio::signal::ctrl_c().map(|_| ())).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod agent;
mod config;
mod error;
mod transport;

pub use agent::{AgentStats, DeviceAgent};
pub use config::{AgentConfig, DEFAULT_SERVER_ADDR};
pub use error::{AgentError, AgentResult};
pub use transport::{AgentTransport, LoopbackTransport, TcpTransport};
