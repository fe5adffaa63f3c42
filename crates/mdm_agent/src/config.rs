//! Agent configuration.

use crate::error::{AgentError, AgentResult};
use mdm_core::{DeviceId, DeviceType};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default server address agents and operators connect to.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:44044";

/// Configuration for a device agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// External identifier the device registers under.
    pub device_id: DeviceId,
    /// Device platform.
    pub device_type: DeviceType,
    /// Server address (`host:port`).
    pub server_addr: String,
    /// Time between pings.
    pub ping_interval: Duration,
    /// Time to wait for each reply.
    pub request_timeout: Duration,
    /// Location label reported in pings.
    pub location: String,
    /// Battery level reported in pings.
    pub battery: i32,
}

/// On-disk form of [`AgentConfig`]. Only `device_id` is required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentConfigFile {
    device_id: String,
    device_type: Option<i32>,
    server_addr: Option<String>,
    ping_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    location: Option<String>,
    battery: Option<i32>,
}

impl AgentConfig {
    /// Creates a new agent configuration.
    pub fn new(device_id: DeviceId) -> Self {
        Self {
            device_id,
            device_type: DeviceType::Android,
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            ping_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            location: "unknown".to_string(),
            battery: 100,
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: &Path) -> AgentResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> AgentResult<Self> {
        let file: AgentConfigFile =
            serde_json::from_str(text).map_err(|e| AgentError::Config(e.to_string()))?;

        let device_id =
            DeviceId::parse(&file.device_id).map_err(|e| AgentError::Config(e.to_string()))?;
        let mut config = Self::new(device_id);

        if let Some(raw) = file.device_type {
            config.device_type =
                DeviceType::try_from(raw).map_err(|e| AgentError::Config(e.to_string()))?;
        }
        if let Some(addr) = file.server_addr {
            config.server_addr = addr;
        }
        if let Some(secs) = file.ping_interval_secs {
            config.ping_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(location) = file.location {
            config.location = location;
        }
        if let Some(battery) = file.battery {
            config.battery = battery;
        }
        config.validate()?;
        Ok(config)
    }

    /// Checks values the agent loop cannot run with.
    pub fn validate(&self) -> AgentResult<()> {
        if self.ping_interval.is_zero() {
            return Err(AgentError::Config("ping interval must be positive".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(AgentError::Config("request timeout must be positive".into()));
        }
        Ok(())
    }

    /// Sets the device type.
    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Sets the server address.
    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = addr.into();
        self
    }

    /// Sets the ping interval.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the reported location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Sets the reported battery level.
    pub fn with_battery(mut self, battery: i32) -> Self {
        self.battery = battery;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6f9619ff-8b86-d011-b42d-00cf4fc964ff";

    #[test]
    fn config_builder() {
        let id = DeviceId::new_v4();
        let config = AgentConfig::new(id)
            .with_device_type(DeviceType::Windows)
            .with_server_addr("10.0.0.1:9000")
            .with_ping_interval(Duration::from_secs(1))
            .with_location("lab")
            .with_battery(42);

        assert_eq!(config.device_id, id);
        assert_eq!(config.device_type, DeviceType::Windows);
        assert_eq!(config.server_addr, "10.0.0.1:9000");
        assert_eq!(config.ping_interval, Duration::from_secs(1));
        assert_eq!(config.location, "lab");
        assert_eq!(config.battery, 42);
    }

    #[test]
    fn json_minimal() {
        let config = AgentConfig::from_json(&format!(r#"{{"device_id": "{ID}"}}"#)).unwrap();
        assert_eq!(config.device_id.to_string(), ID);
        assert_eq!(config.server_addr, DEFAULT_SERVER_ADDR);
        assert_eq!(config.ping_interval, Duration::from_secs(5));
    }

    #[test]
    fn json_full() {
        let config = AgentConfig::from_json(&format!(
            r#"{{
                "device_id": "{ID}",
                "device_type": 1,
                "server_addr": "mdm.local:44044",
                "ping_interval_secs": 30,
                "location": "warehouse",
                "battery": 77
            }}"#
        ))
        .unwrap();
        assert_eq!(config.device_type, DeviceType::Ios);
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.location, "warehouse");
        assert_eq!(config.battery, 77);
    }

    #[test]
    fn json_rejects_bad_values() {
        for text in [
            r#"{}"#.to_string(),
            r#"{"device_id": "nope"}"#.to_string(),
            format!(r#"{{"device_id": "{ID}", "device_type": 7}}"#),
            format!(r#"{{"device_id": "{ID}", "ping_interval_secs": 0}}"#),
        ] {
            assert!(matches!(
                AgentConfig::from_json(&text),
                Err(AgentError::Config(_))
            ));
        }
    }
}
