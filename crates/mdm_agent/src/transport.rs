//! Transport layer between agents (or operators) and the MDM server.

use crate::error::{AgentError, AgentResult};
use mdm_core::{DeviceId, DeviceType};
use mdm_protocol::{
    decode_reply, read_frame, write_frame, DevicePingRequest, DeviceRegisterRequest,
    DeviceStateRequest, Reply, Request, Response, DEFAULT_MAX_FRAME_SIZE,
};
use mdm_server::MdmServer;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

/// Carries requests to the MDM server.
///
/// Implementors only provide [`AgentTransport::call`]; the agent-facing
/// RPCs are built on top of it.
#[allow(async_fn_in_trait)]
pub trait AgentTransport {
    /// Sends one request and waits for its reply.
    async fn call(&self, request: Request) -> AgentResult<Response>;

    /// Registers the device.
    async fn register(&self, id: &DeviceId, device_type: DeviceType) -> AgentResult<()> {
        let request = Request::DeviceRegister(DeviceRegisterRequest {
            device_id: id.to_string(),
            device_type: device_type.as_i32(),
        });
        match self.call(request).await? {
            Response::DeviceRegister(r) if r.success => Ok(()),
            Response::DeviceRegister(_) => Err(AgentError::transport(
                "server refused registration",
                false,
            )),
            _ => Err(AgentError::UnexpectedResponse {
                expected: "DeviceRegister",
            }),
        }
    }

    /// Reports status; returns true if the configuration changed.
    async fn ping(&self, id: &DeviceId, location: &str, battery: i32) -> AgentResult<bool> {
        let request = Request::DevicePing(DevicePingRequest {
            device_id: id.to_string(),
            location: location.to_string(),
            battery,
        });
        match self.call(request).await? {
            Response::DevicePing(r) => Ok(r.state_changed),
            _ => Err(AgentError::UnexpectedResponse {
                expected: "DevicePing",
            }),
        }
    }

    /// Fetches the current configuration and acknowledges it.
    async fn fetch_state(&self, id: &DeviceId) -> AgentResult<BTreeMap<String, bool>> {
        let request = Request::DeviceState(DeviceStateRequest {
            device_id: id.to_string(),
        });
        match self.call(request).await? {
            Response::DeviceState(r) => Ok(r.features),
            _ => Err(AgentError::UnexpectedResponse {
                expected: "DeviceState",
            }),
        }
    }
}

/// Transport over one persistent TCP connection.
///
/// The connection is opened on first use. After a transport or framing
/// failure it is dropped and reopened by the next call; a failure status
/// from the server keeps it open.
pub struct TcpTransport {
    addr: String,
    timeout: Duration,
    max_frame_size: usize,
    conn: Mutex<Option<TcpStream>>,
}

impl TcpTransport {
    /// Creates a transport for `addr` (`host:port`).
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: Duration::from_secs(10),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            conn: Mutex::new(None),
        }
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns true if a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    async fn connect(&self) -> AgentResult<TcpStream> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| AgentError::transport(format!("connect {}: {e}", self.addr), true))?;
        stream.set_nodelay(true)?;
        debug!(addr = %self.addr, "connected");
        Ok(stream)
    }
}

async fn exchange(stream: &mut TcpStream, body: &[u8], max_frame_size: usize) -> AgentResult<Reply> {
    write_frame(stream, body).await?;
    let reply = read_frame(stream, max_frame_size)
        .await?
        .ok_or_else(|| AgentError::transport("connection closed by server", true))?;
    Ok(decode_reply(&reply)?)
}

/// A reply that failed to decode leaves the stream on a frame boundary;
/// anything else may leave a partial or late frame behind.
fn breaks_connection(err: &AgentError) -> bool {
    match err {
        AgentError::Protocol(e) => e.is_fatal(),
        _ => true,
    }
}

impl AgentTransport for TcpTransport {
    async fn call(&self, request: Request) -> AgentResult<Response> {
        let body = request.encode()?;
        let mut conn = self.conn.lock().await;

        if conn.is_none() {
            *conn = Some(self.connect().await?);
        }
        let Some(stream) = conn.as_mut() else {
            return Err(AgentError::transport("not connected", true));
        };

        let result = match tokio::time::timeout(
            self.timeout,
            exchange(stream, &body, self.max_frame_size),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout),
        };
        if let Err(e) = &result {
            if breaks_connection(e) {
                debug!(addr = %self.addr, rpc = request.name(), error = %e, "dropping connection");
                *conn = None;
            }
        }

        result?.map_err(AgentError::Rejected)
    }
}

/// Transport that calls an in-process server directly.
#[derive(Clone)]
pub struct LoopbackTransport {
    server: Arc<MdmServer>,
}

impl LoopbackTransport {
    /// Creates a loopback transport.
    pub fn new(server: Arc<MdmServer>) -> Self {
        Self { server }
    }
}

impl AgentTransport for LoopbackTransport {
    async fn call(&self, request: Request) -> AgentResult<Response> {
        self.server.handle(request).map_err(AgentError::Rejected)
    }
}
