//! Server configuration.

use crate::error::{ServerError, ServerResult};
use mdm_core::FeatureCatalog;
use mdm_protocol::DEFAULT_MAX_FRAME_SIZE;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port the server listens on.
pub const DEFAULT_PORT: u16 = 44044;

/// Configuration for the MDM server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Database file; `None` keeps the registry in memory.
    pub storage_path: Option<PathBuf>,
    /// How long a connection may sit idle between requests.
    pub request_timeout: Duration,
    /// Maximum request frame size in bytes.
    pub max_frame_size: usize,
    /// Features every device carries.
    pub catalog: FeatureCatalog,
}

/// On-disk form of [`ServerConfig`]. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerConfigFile {
    bind_addr: Option<SocketAddr>,
    storage_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    max_frame_size: Option<usize>,
    features: Option<FeatureCatalog>,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            storage_path: None,
            request_timeout: Duration::from_secs(30),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            catalog: FeatureCatalog::default(),
        }
    }

    /// Loads a configuration from a JSON file, filling gaps with defaults.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Parses a configuration from JSON text, filling gaps with defaults.
    pub fn from_json(text: &str) -> ServerResult<Self> {
        let file: ServerConfigFile =
            serde_json::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;

        let mut config = Self::default();
        if let Some(addr) = file.bind_addr {
            config.bind_addr = addr;
        }
        config.storage_path = file.storage_path;
        if let Some(secs) = file.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = file.max_frame_size {
            config.max_frame_size = size;
        }
        if let Some(catalog) = file.features {
            config.catalog = catalog;
        }
        Ok(config)
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Persists the registry at `path`.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Sets the idle timeout per connection.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the maximum request frame size.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the feature catalog.
    pub fn with_catalog(mut self, catalog: FeatureCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.storage_path.is_none());
        assert_eq!(config.catalog, FeatureCatalog::default());
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap())
            .with_storage_path("/var/lib/mdm/mdm.db")
            .with_request_timeout(Duration::from_secs(5))
            .with_max_frame_size(4096);

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.storage_path, Some(PathBuf::from("/var/lib/mdm/mdm.db")));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_frame_size, 4096);
    }

    #[test]
    fn json_overrides_defaults() {
        let config = ServerConfig::from_json(
            r#"{
                "bind_addr": "0.0.0.0:7000",
                "storage_path": "mdm.db",
                "features": [
                    {"name": "camera", "default": false},
                    {"name": "gps", "default": true}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.storage_path, Some(PathBuf::from("mdm.db")));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog.defaults()["gps"], true);
    }

    #[test]
    fn json_rejects_bad_catalog() {
        let result = ServerConfig::from_json(r#"{"features": []}"#);
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let result = ServerConfig::from_json(r#"{"port": 1}"#);
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn missing_file() {
        let result = ServerConfig::from_file(Path::new("/nonexistent/mdm.json"));
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
