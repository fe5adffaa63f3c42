//! Pending-configuration tracking.

use crate::types::DeviceId;
use dashmap::DashSet;

/// Tracks which devices have configuration they have not fetched yet.
///
/// The flag lives only for the lifetime of the process. A device is dirty
/// from the first configuration change after its last fetch until the
/// next fetch. An absent entry reads as "not dirty".
///
/// Every operation is atomic for its key.
pub struct DirtyTracker {
    dirty: DashSet<DeviceId>,
}

impl DirtyTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self {
            dirty: DashSet::new(),
        }
    }

    /// Records a configuration change for `id`.
    pub fn mark_dirty(&self, id: &DeviceId) {
        self.dirty.insert(*id);
    }

    /// Returns whether `id` has an unfetched change, without clearing it.
    pub fn is_dirty(&self, id: &DeviceId) -> bool {
        self.dirty.contains(id)
    }

    /// Returns whether `id` had an unfetched change and clears it in the
    /// same step.
    pub fn consume_dirty(&self, id: &DeviceId) -> bool {
        self.dirty.remove(id).is_some()
    }

    /// Returns the number of dirty devices.
    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    /// Returns true if no device is dirty.
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }
}

impl Default for DirtyTracker {
    fn default() -> Self {
        Self::new()
    }
}
