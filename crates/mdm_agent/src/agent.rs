//! The device agent loop.

use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::transport::AgentTransport;
use mdm_core::FeatureCatalog;
use std::collections::BTreeMap;
use std::future::Future;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Agent statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Pings answered by the server.
    pub pings: u64,
    /// Configurations fetched and applied.
    pub fetches: u64,
    /// Ticks that failed.
    pub errors: u64,
}

/// A simulated managed device.
///
/// The agent registers once, then pings on a fixed interval. When a ping
/// reports a configuration change, it fetches and applies the new
/// configuration before the next ping.
pub struct DeviceAgent<T: AgentTransport> {
    config: AgentConfig,
    transport: T,
    applied: BTreeMap<String, bool>,
    stats: AgentStats,
}

impl<T: AgentTransport> DeviceAgent<T> {
    /// Creates an agent that starts from the default feature configuration.
    pub fn new(config: AgentConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            applied: FeatureCatalog::default().defaults(),
            stats: AgentStats::default(),
        }
    }

    /// Returns the configuration currently applied on the device.
    ///
    /// Until the first fetch this is the built-in default catalog, which
    /// may differ from the one the server is configured with.
    pub fn applied(&self) -> &BTreeMap<String, bool> {
        &self.applied
    }

    /// Returns the agent statistics.
    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    /// Changes the status reported by subsequent pings.
    pub fn set_status(&mut self, location: impl Into<String>, battery: i32) {
        self.config.location = location.into();
        self.config.battery = battery;
    }

    /// Registers the device with the server.
    pub async fn register(&mut self) -> AgentResult<()> {
        let id = self.config.device_id;
        self.transport.register(&id, self.config.device_type).await?;
        info!(device_id = %id, device_type = %self.config.device_type, "device registered");
        Ok(())
    }

    /// Pings once, fetching the configuration if it changed.
    ///
    /// Returns true if a new configuration was applied.
    pub async fn tick(&mut self) -> AgentResult<bool> {
        let id = self.config.device_id;
        let changed = self
            .transport
            .ping(&id, &self.config.location, self.config.battery)
            .await?;
        self.stats.pings += 1;

        if !changed {
            return Ok(false);
        }

        info!(device_id = %id, "configuration change detected, fetching state");
        let features = self.transport.fetch_state(&id).await?;
        self.apply(features);
        self.stats.fetches += 1;
        Ok(true)
    }

    fn apply(&mut self, features: BTreeMap<String, bool>) {
        for (name, state) in &features {
            if self.applied.get(name) != Some(state) {
                info!(device_id = %self.config.device_id, feature = %name, state, "feature changed");
            }
        }
        self.applied = features;
    }

    /// Registers, pulls the server's configuration, then ticks every ping
    /// interval until `shutdown` completes.
    ///
    /// Failed ticks are logged and retried at the next interval.
    pub async fn run<F>(&mut self, shutdown: F) -> AgentResult<()>
    where
        F: Future<Output = ()>,
    {
        self.config.validate()?;
        self.register().await?;
        let features = self.transport.fetch_state(&self.config.device_id).await?;
        self.apply(features);
        self.stats.fetches += 1;

        let mut interval = tokio::time::interval(self.config.ping_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(device_id = %self.config.device_id, stats = ?self.stats, "device stopping");
                    return Ok(());
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        self.stats.errors += 1;
                        warn!(device_id = %self.config.device_id, error = %e, "ping cycle failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use mdm_core::{DeviceId, CAMERA, STORAGE};
    use mdm_protocol::{
        DevicePingResponse, DeviceRegisterResponse, DeviceStateResponse, Request, Response, Status,
    };
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Transport that replays scripted replies and records requests.
    #[derive(Default)]
    struct MockTransport {
        replies: RefCell<VecDeque<AgentResult<Response>>>,
        requests: RefCell<Vec<&'static str>>,
    }

    impl MockTransport {
        fn push(&self, reply: AgentResult<Response>) {
            self.replies.borrow_mut().push_back(reply);
        }
    }

    impl AgentTransport for MockTransport {
        async fn call(&self, request: Request) -> AgentResult<Response> {
            self.requests.borrow_mut().push(request.name());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(AgentError::transport("no scripted reply", false)))
        }
    }

    fn agent() -> DeviceAgent<MockTransport> {
        DeviceAgent::new(AgentConfig::new(DeviceId::new_v4()), MockTransport::default())
    }

    #[tokio::test]
    async fn unchanged_ping_skips_fetch() {
        let mut agent = agent();
        agent
            .transport
            .push(Ok(Response::DevicePing(DevicePingResponse { state_changed: false })));

        assert!(!agent.tick().await.unwrap());
        assert_eq!(*agent.transport.requests.borrow(), vec!["DevicePing"]);
        assert_eq!(agent.applied()[CAMERA], false);
    }

    #[tokio::test]
    async fn changed_ping_fetches_and_applies() {
        let mut agent = agent();
        let mut features = BTreeMap::new();
        features.insert(CAMERA.to_string(), true);
        features.insert(STORAGE.to_string(), false);
        agent
            .transport
            .push(Ok(Response::DevicePing(DevicePingResponse { state_changed: true })));
        agent
            .transport
            .push(Ok(Response::DeviceState(DeviceStateResponse { features })));

        assert!(agent.tick().await.unwrap());
        assert_eq!(
            *agent.transport.requests.borrow(),
            vec!["DevicePing", "DeviceState"]
        );
        assert_eq!(agent.applied()[CAMERA], true);
        assert_eq!(agent.stats().fetches, 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_config() {
        let mut agent = agent();
        agent
            .transport
            .push(Ok(Response::DevicePing(DevicePingResponse { state_changed: true })));
        agent
            .transport
            .push(Err(AgentError::Rejected(Status::internal("db down"))));

        assert!(agent.tick().await.is_err());
        assert_eq!(agent.applied(), &FeatureCatalog::default().defaults());
    }

    #[tokio::test]
    async fn wrong_response_kind() {
        let mut agent = agent();
        agent
            .transport
            .push(Ok(Response::DeviceState(DeviceStateResponse::default())));

        assert!(matches!(
            agent.tick().await,
            Err(AgentError::UnexpectedResponse { expected: "DevicePing" })
        ));
    }

    #[tokio::test]
    async fn run_adopts_server_catalog_before_pinging() {
        let mut agent = agent();
        let mut features = BTreeMap::new();
        features.insert("gps".to_string(), true);
        agent
            .transport
            .push(Ok(Response::DeviceRegister(DeviceRegisterResponse { success: true })));
        agent
            .transport
            .push(Ok(Response::DeviceState(DeviceStateResponse {
                features: features.clone(),
            })));

        agent.run(std::future::ready(())).await.unwrap();

        assert_eq!(
            *agent.transport.requests.borrow(),
            vec!["DeviceRegister", "DeviceState"]
        );
        assert_eq!(agent.applied(), &features);
        assert_eq!(agent.stats().pings, 0);
    }
}
