//! Operator-facing queries and configuration changes.

use crate::error::ServiceResult;
use crate::management::FeatureMutator;
use crate::registry::DeviceRegistry;
use mdm_core::{Device, DeviceFeatures, DeviceId, DeviceStatus, DeviceType};
use std::sync::Arc;
use tracing::debug;

/// Read access to the registry plus feature changes for operators.
///
/// Feature changes are delegated to a [`FeatureMutator`] so that the
/// device is always marked as having a pending change.
pub struct ControlService {
    registry: Arc<dyn DeviceRegistry>,
    mutator: Arc<dyn FeatureMutator>,
}

impl ControlService {
    /// Creates a control service.
    pub fn new(registry: Arc<dyn DeviceRegistry>, mutator: Arc<dyn FeatureMutator>) -> Self {
        Self { registry, mutator }
    }

    /// Lists the external ids of all devices, in registration order.
    pub fn device_ids(&self) -> ServiceResult<Vec<DeviceId>> {
        let devices = self.registry.list_devices()?;
        debug!(op = "Control.DeviceList", count = devices.len());
        Ok(devices.into_iter().map(|d| d.id).collect())
    }

    /// Returns a device's type.
    pub fn device_info(&self, id: &DeviceId) -> ServiceResult<DeviceType> {
        Ok(self.registry.device(id)?.device_type)
    }

    /// Returns a device's last reported status.
    pub fn device_status(&self, id: &DeviceId) -> ServiceResult<DeviceStatus> {
        Ok(self.registry.status(id)?)
    }

    /// Returns a device's feature configuration.
    pub fn device_features(&self, id: &DeviceId) -> ServiceResult<DeviceFeatures> {
        Ok(self.registry.features(id)?)
    }

    /// Lists every device with its type.
    pub fn device_info_list(&self) -> ServiceResult<Vec<Device>> {
        Ok(self.registry.list_devices()?)
    }

    /// Lists the status of every device that has pinged at least once.
    pub fn device_status_list(&self) -> ServiceResult<Vec<DeviceStatus>> {
        Ok(self.registry.list_statuses()?)
    }

    /// Lists every device's feature configuration.
    pub fn device_features_list(&self) -> ServiceResult<Vec<DeviceFeatures>> {
        Ok(self.registry.list_features()?)
    }

    /// Changes one feature of one device.
    pub fn set_feature_state(&self, id: &DeviceId, feature: &str, state: bool) -> ServiceResult<()> {
        self.mutator.set_feature_state(id, feature, state)
    }
}
