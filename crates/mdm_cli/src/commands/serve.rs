//! Serve command implementation.

use mdm_server::{MdmServer, ServerConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runs the MDM server until Ctrl-C.
pub async fn run(
    config_path: Option<&Path>,
    bind: Option<SocketAddr>,
    db: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = bind {
        config = config.with_bind_addr(addr);
    }
    if let Some(path) = db {
        config = config.with_storage_path(path);
    }

    info!(
        bind = %config.bind_addr,
        storage = ?config.storage_path,
        "starting MDM server v{}",
        mdm_core::VERSION
    );

    let server = Arc::new(MdmServer::new(config)?);
    let listener = server.bind().await?;
    server
        .serve_until(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("server stopped");
    Ok(())
}
