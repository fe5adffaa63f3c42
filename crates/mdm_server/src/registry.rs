//! Storage seam used by the services.

use mdm_core::{
    Device, DeviceFeatures, DeviceId, DeviceKey, DeviceStatus, DeviceType, Store, StoreResult,
};

/// Persistent device registry as seen by the services.
///
/// [`Store`] is the production implementation; tests substitute their own.
pub trait DeviceRegistry: Send + Sync {
    /// Registers a device with default configuration. Idempotent.
    fn register_device(&self, id: &DeviceId, device_type: DeviceType) -> StoreResult<DeviceKey>;

    /// Looks up a device.
    fn device(&self, id: &DeviceId) -> StoreResult<Device>;

    /// Lists all devices.
    fn list_devices(&self) -> StoreResult<Vec<Device>>;

    /// Overwrites a device's last status.
    fn update_status(&self, id: &DeviceId, location: &str, battery: i32) -> StoreResult<()>;

    /// Reads a device's last status.
    fn status(&self, id: &DeviceId) -> StoreResult<DeviceStatus>;

    /// Lists the status of every device that has pinged.
    fn list_statuses(&self) -> StoreResult<Vec<DeviceStatus>>;

    /// Sets one feature of one device.
    fn set_feature(&self, id: &DeviceId, feature: &str, state: bool) -> StoreResult<()>;

    /// Reads a device's configuration.
    fn features(&self, id: &DeviceId) -> StoreResult<DeviceFeatures>;

    /// Lists every device's configuration.
    fn list_features(&self) -> StoreResult<Vec<DeviceFeatures>>;
}

impl DeviceRegistry for Store {
    fn register_device(&self, id: &DeviceId, device_type: DeviceType) -> StoreResult<DeviceKey> {
        Store::register_device(self, id, device_type)
    }

    fn device(&self, id: &DeviceId) -> StoreResult<Device> {
        Store::device(self, id)
    }

    fn list_devices(&self) -> StoreResult<Vec<Device>> {
        Store::list_devices(self)
    }

    fn update_status(&self, id: &DeviceId, location: &str, battery: i32) -> StoreResult<()> {
        Store::update_status(self, id, location, battery)
    }

    fn status(&self, id: &DeviceId) -> StoreResult<DeviceStatus> {
        Store::status(self, id)
    }

    fn list_statuses(&self) -> StoreResult<Vec<DeviceStatus>> {
        Store::list_statuses(self)
    }

    fn set_feature(&self, id: &DeviceId, feature: &str, state: bool) -> StoreResult<()> {
        Store::set_feature(self, id, feature, state)
    }

    fn features(&self, id: &DeviceId) -> StoreResult<DeviceFeatures> {
        Store::features(self, id)
    }

    fn list_features(&self) -> StoreResult<Vec<DeviceFeatures>> {
        Store::list_features(self)
    }
}
