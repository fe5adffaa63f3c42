//! MDM server: wiring and the TCP accept loop.

use crate::config::ServerConfig;
use crate::control::ControlService;
use crate::error::ServerResult;
use crate::handler::RequestHandler;
use crate::management::{FeatureMutator, ManagementService};
use crate::registry::DeviceRegistry;
use mdm_core::{DirtyTracker, Store};
use mdm_protocol::{
    encode_reply, read_frame, write_frame, ProtocolResult, Reply, Request, Status,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// The MDM server.
///
/// Owns the registry, the dirty tracker and both services. Requests can be
/// handled directly through [`MdmServer::handle`] or served over TCP.
pub struct MdmServer {
    config: ServerConfig,
    tracker: Arc<DirtyTracker>,
    handler: RequestHandler,
}

impl MdmServer {
    /// Creates a server, opening the registry described by `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let catalog = Arc::new(config.catalog.clone());
        let store = match &config.storage_path {
            Some(path) => Store::open(path, catalog)?,
            None => Store::open_in_memory(catalog)?,
        };
        info!(
            storage = ?config.storage_path,
            features = config.catalog.len(),
            "device registry opened"
        );
        Ok(Self::with_registry(config, Arc::new(store)))
    }

    /// Creates a server on top of an existing registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<dyn DeviceRegistry>) -> Self {
        let tracker = Arc::new(DirtyTracker::new());
        let management = Arc::new(ManagementService::new(
            Arc::clone(&registry),
            Arc::clone(&tracker),
        ));
        let mutator: Arc<dyn FeatureMutator> = management.clone();
        let control = ControlService::new(registry, mutator);

        Self {
            config,
            tracker,
            handler: RequestHandler::new(management, control),
        }
    }

    /// Handles one request.
    pub fn handle(&self, request: Request) -> Reply {
        self.handler.handle(request)
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the dirty tracker.
    pub fn tracker(&self) -> &DirtyTracker {
        &self.tracker
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(listener)
    }

    /// Binds the configured address and serves forever.
    pub async fn serve(self: Arc<Self>) -> ServerResult<()> {
        let listener = self.bind().await?;
        self.serve_until(listener, std::future::pending()).await
    }

    /// Serves connections from `listener` until `shutdown` completes.
    ///
    /// Each connection runs on its own task. Connections still open at
    /// shutdown are left to finish their current request.
    pub async fn serve_until<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            debug!(%peer, "connection opened");
                            match server.serve_connection(stream).await {
                                Ok(()) => debug!(%peer, "connection closed"),
                                Err(e) => debug!(%peer, error = %e, "connection dropped"),
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }
    }

    async fn serve_connection(self: Arc<Self>, mut stream: TcpStream) -> ProtocolResult<()> {
        let max_frame_size = self.config.max_frame_size;
        loop {
            let read = tokio::time::timeout(
                self.config.request_timeout,
                read_frame(&mut stream, max_frame_size),
            );
            let body = match read.await {
                Ok(frame) => match frame? {
                    Some(body) => body,
                    None => return Ok(()),
                },
                Err(_) => {
                    debug!("connection idle past request timeout");
                    return Ok(());
                }
            };

            let reply = match Request::decode(&body) {
                Ok(request) => {
                    let server = Arc::clone(&self);
                    tokio::task::spawn_blocking(move || server.handle(request))
                        .await
                        .unwrap_or_else(|e| {
                            warn!(error = %e, "request task failed");
                            Err(Status::internal("internal error"))
                        })
                }
                Err(e) => Err(Status::invalid_argument(format!("malformed request: {e}"))),
            };

            write_frame(&mut stream, &encode_reply(&reply)?).await?;
        }
    }
}
