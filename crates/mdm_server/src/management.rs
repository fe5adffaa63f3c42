//! Agent-facing device management.

use crate::error::{ServiceError, ServiceResult};
use crate::registry::DeviceRegistry;
use mdm_core::{validate_battery, DeviceFeatures, DeviceId, DeviceKey, DeviceType, DirtyTracker};
use std::sync::Arc;
use tracing::info;

/// Applies configuration changes on behalf of other services.
///
/// Every configuration mutation goes through this seam so the device is
/// always marked as having a pending change.
pub trait FeatureMutator: Send + Sync {
    /// Sets one feature of one device and marks the device dirty.
    fn set_feature_state(&self, id: &DeviceId, feature: &str, state: bool) -> ServiceResult<()>;
}

/// Implements registration, ping and state fetch for device agents.
///
/// Per device, the observable state is "synchronized" or "has pending
/// change". A feature mutation moves the device to pending; only a state
/// fetch moves it back. Ping reports the state without changing it.
pub struct ManagementService {
    registry: Arc<dyn DeviceRegistry>,
    tracker: Arc<DirtyTracker>,
}

impl ManagementService {
    /// Creates a management service.
    pub fn new(registry: Arc<dyn DeviceRegistry>, tracker: Arc<DirtyTracker>) -> Self {
        Self { registry, tracker }
    }

    /// Registers a device. Re-registering a known device is a no-op.
    pub fn register(&self, id: &DeviceId, device_type: DeviceType) -> ServiceResult<DeviceKey> {
        info!(op = "Management.DeviceRegister", device_id = %id, %device_type, "attempting to register device");

        let key = self.registry.register_device(id, device_type)?;

        info!(op = "Management.DeviceRegister", device_id = %id, %key, "device registered");
        Ok(key)
    }

    /// Records a device's status and reports whether its configuration changed.
    pub fn ping(&self, id: &DeviceId, location: &str, battery: i32) -> ServiceResult<bool> {
        if location.is_empty() {
            return Err(ServiceError::Validation("location is required".into()));
        }
        let battery = validate_battery(battery)?;

        info!(op = "Management.DevicePing", device_id = %id, location, battery, "processing ping");

        self.registry.update_status(id, location, i32::from(battery))?;
        let state_changed = self.tracker.is_dirty(id);

        info!(op = "Management.DevicePing", device_id = %id, state_changed, "ping processed");
        Ok(state_changed)
    }

    /// Returns the device's configuration and clears its pending flag.
    ///
    /// The flag is cleared before the read, so a mutation racing with the
    /// fetch is either included in the result or leaves the flag set.
    pub fn fetch_state(&self, id: &DeviceId) -> ServiceResult<DeviceFeatures> {
        info!(op = "Management.DeviceState", device_id = %id, "preparing device state");

        let was_dirty = self.tracker.consume_dirty(id);
        let features = match self.registry.features(id) {
            Ok(features) => features,
            Err(e) => {
                if was_dirty {
                    self.tracker.mark_dirty(id);
                }
                return Err(e.into());
            }
        };

        info!(
            op = "Management.DeviceState",
            device_id = %id,
            was_dirty,
            features = features.features.len(),
            "device state prepared"
        );
        Ok(features)
    }
}

impl FeatureMutator for ManagementService {
    fn set_feature_state(&self, id: &DeviceId, feature: &str, state: bool) -> ServiceResult<()> {
        if feature.is_empty() {
            return Err(ServiceError::Validation("feature is required".into()));
        }

        info!(op = "Management.SetDeviceFeatureState", device_id = %id, feature, state, "changing feature state");

        self.registry.set_feature(id, feature, state)?;
        self.tracker.mark_dirty(id);

        info!(op = "Management.SetDeviceFeatureState", device_id = %id, feature, state, "feature state changed");
        Ok(())
    }
}
