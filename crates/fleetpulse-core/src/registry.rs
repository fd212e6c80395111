//! Fleet-wide device registry.
//!
//! The registry maps device IDs to shared [`DeviceStats`] handles behind a
//! reader-writer lock that guards the map structure only. Every operation
//! clones the handle out and drops the map guard before touching the device,
//! so traffic for one device never serializes behind another.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::stats::{DeviceStats, StatsReport};

/// Thread-safe map from device ID to its statistics.
#[derive(Debug, Default)]
pub struct Registry {
    devices: RwLock<HashMap<String, Arc<DeviceStats>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `device_id` with zeroed stats. Registering a known ID is a
    /// no-op and keeps the existing stats instance.
    ///
    /// Returns `true` if the device was newly added.
    pub fn register_device(&self, device_id: &str) -> bool {
        let mut devices = self.write();
        if devices.contains_key(device_id) {
            return false;
        }
        devices.insert(device_id.to_string(), Arc::new(DeviceStats::new()));
        debug!("registered device {device_id}");
        true
    }

    /// Shared handle to the stats for `device_id`.
    pub fn lookup(&self, device_id: &str) -> RegistryResult<Arc<DeviceStats>> {
        self.read()
            .get(device_id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found(device_id))
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.read().contains_key(device_id)
    }

    /// Record a heartbeat for a registered device.
    pub fn record_heartbeat(&self, device_id: &str, sent_at: DateTime<Utc>) -> RegistryResult<()> {
        self.lookup(device_id)?.record_heartbeat(sent_at);
        Ok(())
    }

    /// Record an upload sample for a registered device.
    pub fn record_upload(&self, device_id: &str, duration: Duration) -> RegistryResult<()> {
        self.lookup(device_id)?.record_upload(duration);
        Ok(())
    }

    /// Uptime and average upload time for a registered device.
    pub fn report(&self, device_id: &str) -> RegistryResult<StatsReport> {
        Ok(self.lookup(device_id)?.report())
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All registered device IDs, sorted.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<DeviceStats>>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<DeviceStats>>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: AsRef<str>> FromIterator<S> for Registry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let registry = Self::new();
        for id in iter {
            registry.register_device(id.as_ref());
        }
        registry
    }
}
