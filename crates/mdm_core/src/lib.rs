//! # MDM Core
//!
//! Device registry for the MDM server.
//!
//! This crate provides:
//! - The device data model (identity, type, status, feature configuration)
//! - The feature catalog every device is seeded from
//! - A SQLite-backed store with transactional registration
//! - The dirty-state tracker that drives configuration pulls
//!
//! ## Key Invariants
//!
//! - A registered device has exactly one feature entry per catalog feature
//! - Re-registering a known identifier never resets its configuration
//! - A device is dirty iff its configuration changed since its last fetch

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod catalog;
mod dirty;
mod error;
mod store;
mod types;

pub use catalog::{FeatureCatalog, FeatureDefault, CAMERA, STORAGE};
pub use dirty::DirtyTracker;
pub use error::{CoreError, CoreResult, StoreError, StoreResult};
pub use store::{group_feature_rows, FeatureRow, Store};
pub use types::{
    validate_battery, Device, DeviceFeatures, DeviceId, DeviceKey, DeviceStatus, DeviceType,
    BATTERY_MAX, BATTERY_MIN,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
