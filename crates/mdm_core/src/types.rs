//! Core type definitions for the device registry.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Storage-assigned identity of a registered device.
///
/// Keys are only meaningful inside the store that assigned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceKey(pub i64);

impl DeviceKey {
    /// Creates a device key.
    #[must_use]
    pub const fn new(key: i64) -> Self {
        Self(key)
    }

    /// Returns the raw key value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev:{}", self.0)
    }
}

/// Globally unique external identifier of a device.
///
/// Device IDs are 128-bit UUIDs that are:
/// - Chosen by the device itself
/// - Immutable once registered
/// - Never reused
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Creates a new random device ID.
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a device ID, rejecting empty and malformed input.
    pub fn parse(s: &str) -> CoreResult<Self> {
        if s.is_empty() {
            return Err(CoreError::invalid_device_id("device id is required"));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::invalid_device_id(format!("incorrect device id: {e}")))
    }
}

impl FromStr for DeviceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Platform of a managed device. Fixed for the device's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Android phone or tablet.
    Android,
    /// iOS phone or tablet.
    Ios,
    /// Windows workstation.
    Windows,
}

impl DeviceType {
    /// All device types, in ordinal order.
    pub const ALL: [DeviceType; 3] = [DeviceType::Android, DeviceType::Ios, DeviceType::Windows];

    /// Returns the wire/storage ordinal.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            DeviceType::Android => 0,
            DeviceType::Ios => 1,
            DeviceType::Windows => 2,
        }
    }
}

impl TryFrom<i32> for DeviceType {
    type Error = CoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceType::Android),
            1 => Ok(DeviceType::Ios),
            2 => Ok(DeviceType::Windows),
            other => Err(CoreError::InvalidDeviceType { value: other }),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::Android => "Android",
            DeviceType::Ios => "Ios",
            DeviceType::Windows => "Windows",
        };
        f.write_str(name)
    }
}

/// A registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Storage-assigned key.
    pub key: DeviceKey,
    /// External identifier.
    pub id: DeviceId,
    /// Device platform.
    pub device_type: DeviceType,
}

/// Last status reported by a device ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Storage-assigned key of the device.
    pub key: DeviceKey,
    /// External identifier of the device.
    pub id: DeviceId,
    /// Free-text location label.
    pub location: String,
    /// Battery level, 0..=100.
    pub battery: u8,
}

/// Full feature configuration of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFeatures {
    /// Storage-assigned key of the device.
    pub key: DeviceKey,
    /// External identifier of the device.
    pub id: DeviceId,
    /// Feature name to enabled state.
    pub features: BTreeMap<String, bool>,
}

/// Lowest accepted battery level.
pub const BATTERY_MIN: i32 = 0;
/// Highest accepted battery level.
pub const BATTERY_MAX: i32 = 100;

/// Validates a reported battery level and narrows it to a percentage.
pub fn validate_battery(battery: i32) -> CoreResult<u8> {
    if (BATTERY_MIN..=BATTERY_MAX).contains(&battery) {
        u8::try_from(battery).map_err(|_| CoreError::InvalidBattery { value: battery })
    } else {
        Err(CoreError::InvalidBattery { value: battery })
    }
}
