//! Device command implementation.

use mdm_agent::{AgentConfig, DeviceAgent, TcpTransport};
use mdm_core::{DeviceId, DeviceType};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Command-line values that override the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Device UUID.
    pub id: Option<String>,
    /// Device type ordinal.
    pub device_type: Option<i32>,
    /// Reported location.
    pub location: Option<String>,
    /// Reported battery level.
    pub battery: Option<i32>,
    /// Seconds between pings.
    pub interval: Option<u64>,
    /// Server address.
    pub server: String,
}

/// Builds the agent configuration from a config file and flags.
///
/// Flags other than `--server` win over the file. Without a file, `--id`
/// is required.
pub fn build_config(
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<AgentConfig, Box<dyn std::error::Error>> {
    let mut config = match (config_path, &overrides.id) {
        (Some(path), _) => AgentConfig::from_file(path)?,
        (None, Some(id)) => AgentConfig::new(DeviceId::parse(id)?).with_server_addr(&overrides.server),
        (None, None) => return Err("device id required: pass --id or a config file".into()),
    };

    if let Some(id) = &overrides.id {
        config.device_id = DeviceId::parse(id)?;
    }
    if let Some(raw) = overrides.device_type {
        config.device_type = DeviceType::try_from(raw)?;
    }
    if let Some(location) = overrides.location {
        config.location = location;
    }
    if let Some(battery) = overrides.battery {
        config.battery = battery;
    }
    if let Some(secs) = overrides.interval {
        config.ping_interval = Duration::from_secs(secs);
    }
    config.validate()?;
    Ok(config)
}

/// Runs a device agent until Ctrl-C.
pub async fn run(
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(config_path, overrides)?;
    info!(
        device_id = %config.device_id,
        server = %config.server_addr,
        interval = ?config.ping_interval,
        "starting device"
    );

    let transport = TcpTransport::new(config.server_addr.clone()).with_timeout(config.request_timeout);
    let mut agent = DeviceAgent::new(config, transport);
    agent
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!(features = ?agent.applied(), "device stopped");
    Ok(())
}
