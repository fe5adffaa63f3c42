//! Request and response messages.
//!
//! Identifiers travel as UUID strings and device types as their ordinal,
//! exactly as callers supply them; validation happens on the server.

use crate::codec;
use crate::error::ProtocolResult;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The outcome of one RPC.
pub type Reply = Result<Response, Status>;

/// Lists the external ids of all devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListRequest {}

/// Reply to [`DeviceListRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceListResponse {
    /// External ids.
    pub device_ids: Vec<String>,
}

/// Reads one device's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoRequest {
    /// External id.
    pub device_id: String,
}

/// Reply to [`DeviceInfoRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoResponse {
    /// Device type ordinal.
    pub device_type: i32,
}

/// Reads one device's last status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusRequest {
    /// External id.
    pub device_id: String,
}

/// Reply to [`DeviceStatusRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    /// Last reported location.
    pub location: String,
    /// Last reported battery level.
    pub battery: i32,
}

/// Reads one device's feature configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeaturesRequest {
    /// External id.
    pub device_id: String,
}

/// Reply to [`DeviceFeaturesRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeaturesResponse {
    /// Feature name to state.
    pub features: BTreeMap<String, bool>,
}

/// Lists every device with its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoListRequest {}

/// One entry of [`DeviceInfoListResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoItem {
    /// External id.
    pub device_id: String,
    /// Device type ordinal.
    pub device_type: i32,
}

/// Reply to [`DeviceInfoListRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoListResponse {
    /// One item per device.
    pub items: Vec<DeviceInfoItem>,
}

/// Lists the status of every device that has pinged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusListRequest {}

/// One entry of [`DeviceStatusListResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusItem {
    /// External id.
    pub device_id: String,
    /// Last reported location.
    pub location: String,
    /// Last reported battery level.
    pub battery: i32,
}

/// Reply to [`DeviceStatusListRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatusListResponse {
    /// One item per device that has pinged.
    pub items: Vec<DeviceStatusItem>,
}

/// Lists every device's feature configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeaturesListRequest {}

/// One entry of [`DeviceFeaturesListResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeaturesItem {
    /// External id.
    pub device_id: String,
    /// Feature name to state.
    pub features: BTreeMap<String, bool>,
}

/// Reply to [`DeviceFeaturesListRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeaturesListResponse {
    /// One item per device.
    pub items: Vec<DeviceFeaturesItem>,
}

/// Changes one feature of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDeviceFeatureStateRequest {
    /// External id.
    pub device_id: String,
    /// Catalog feature name.
    pub feature: String,
    /// Desired state.
    pub state: bool,
}

/// Reply to [`SetDeviceFeatureStateRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDeviceFeatureStateResponse {
    /// Whether the change was applied.
    pub success: bool,
}

/// Registers a device. Safe to repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegisterRequest {
    /// External id chosen by the device.
    pub device_id: String,
    /// Device type ordinal.
    pub device_type: i32,
}

/// Reply to [`DeviceRegisterRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRegisterResponse {
    /// Whether the device is registered.
    pub success: bool,
}

/// Periodic liveness and status report from a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePingRequest {
    /// External id.
    pub device_id: String,
    /// Current location label.
    pub location: String,
    /// Current battery level, 0..=100.
    pub battery: i32,
}

/// Reply to [`DevicePingRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePingResponse {
    /// True if the device must fetch its configuration before the next ping.
    pub state_changed: bool,
}

/// Fetches the device's current configuration and acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStateRequest {
    /// External id.
    pub device_id: String,
}

/// Reply to [`DeviceStateRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStateResponse {
    /// Feature name to state.
    pub features: BTreeMap<String, bool>,
}

/// Any request understood by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Operator: list ids.
    DeviceList(DeviceListRequest),
    /// Operator: device type.
    DeviceInfo(DeviceInfoRequest),
    /// Operator: device status.
    DeviceStatus(DeviceStatusRequest),
    /// Operator: device features.
    DeviceFeatures(DeviceFeaturesRequest),
    /// Operator: all device types.
    DeviceInfoList(DeviceInfoListRequest),
    /// Operator: all statuses.
    DeviceStatusList(DeviceStatusListRequest),
    /// Operator: all features.
    DeviceFeaturesList(DeviceFeaturesListRequest),
    /// Operator: change a feature.
    SetDeviceFeatureState(SetDeviceFeatureStateRequest),
    /// Agent: register.
    DeviceRegister(DeviceRegisterRequest),
    /// Agent: ping.
    DevicePing(DevicePingRequest),
    /// Agent: fetch configuration.
    DeviceState(DeviceStateRequest),
}

impl Request {
    /// Returns the RPC name.
    pub fn name(&self) -> &'static str {
        match self {
            Request::DeviceList(_) => "DeviceList",
            Request::DeviceInfo(_) => "DeviceInfo",
            Request::DeviceStatus(_) => "DeviceStatus",
            Request::DeviceFeatures(_) => "DeviceFeatures",
            Request::DeviceInfoList(_) => "DeviceInfoList",
            Request::DeviceStatusList(_) => "DeviceStatusList",
            Request::DeviceFeaturesList(_) => "DeviceFeaturesList",
            Request::SetDeviceFeatureState(_) => "SetDeviceFeatureState",
            Request::DeviceRegister(_) => "DeviceRegister",
            Request::DevicePing(_) => "DevicePing",
            Request::DeviceState(_) => "DeviceState",
        }
    }

    /// Returns true for the agent-facing calls.
    pub fn is_management(&self) -> bool {
        matches!(
            self,
            Request::DeviceRegister(_) | Request::DevicePing(_) | Request::DeviceState(_)
        )
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        codec::encode(self)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        codec::decode(bytes)
    }
}

/// Any successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Reply to [`Request::DeviceList`].
    DeviceList(DeviceListResponse),
    /// Reply to [`Request::DeviceInfo`].
    DeviceInfo(DeviceInfoResponse),
    /// Reply to [`Request::DeviceStatus`].
    DeviceStatus(DeviceStatusResponse),
    /// Reply to [`Request::DeviceFeatures`].
    DeviceFeatures(DeviceFeaturesResponse),
    /// Reply to [`Request::DeviceInfoList`].
    DeviceInfoList(DeviceInfoListResponse),
    /// Reply to [`Request::DeviceStatusList`].
    DeviceStatusList(DeviceStatusListResponse),
    /// Reply to [`Request::DeviceFeaturesList`].
    DeviceFeaturesList(DeviceFeaturesListResponse),
    /// Reply to [`Request::SetDeviceFeatureState`].
    SetDeviceFeatureState(SetDeviceFeatureStateResponse),
    /// Reply to [`Request::DeviceRegister`].
    DeviceRegister(DeviceRegisterResponse),
    /// Reply to [`Request::DevicePing`].
    DevicePing(DevicePingResponse),
    /// Reply to [`Request::DeviceState`].
    DeviceState(DeviceStateResponse),
}

/// Encodes a reply to CBOR.
pub fn encode_reply(reply: &Reply) -> ProtocolResult<Vec<u8>> {
    codec::encode(reply)
}

/// Decodes a reply from CBOR.
pub fn decode_reply(bytes: &[u8]) -> ProtocolResult<Reply> {
    codec::decode(bytes)
}
