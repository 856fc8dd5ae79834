//! Process-local store. Everything is lost when the process exits.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{Error, Result};
use crate::model::{AddOutcome, Device, DeviceChanges, NewReading, ReadingChanges, TelemetryRecord};

use super::{DeviceRegistry, RecordStore};

/// Thread-safe in-memory registry and record store.
pub struct MemoryStore {
    devices: Mutex<BTreeMap<String, Device>>,
    records: Mutex<Vec<TelemetryRecord>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(BTreeMap::new()),
            records: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// A store pre-seeded with a single sample device.
    pub fn with_demo_device() -> Self {
        let store = Self::new();
        store.devices_mut().insert(
            "sensor001".to_string(),
            Device::new("sensor001", "Temperature Sensor - Room 1", "Server Room"),
        );
        store
    }

    fn devices_mut(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Device>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.devices.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn records_mut(&self) -> std::sync::MutexGuard<'_, Vec<TelemetryRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry for MemoryStore {
    fn list(&self) -> Result<Vec<Device>> {
        Ok(self.devices_mut().values().cloned().collect())
    }

    fn get(&self, device_id: &str) -> Result<Option<Device>> {
        Ok(self.devices_mut().get(device_id).cloned())
    }

    fn add(&self, device: Device) -> Result<AddOutcome> {
        let replaced = self
            .devices_mut()
            .insert(device.device_id.clone(), device)
            .is_some();
        Ok(if replaced {
            AddOutcome::Replaced
        } else {
            AddOutcome::Created
        })
    }

    fn edit(&self, device_id: &str, changes: DeviceChanges) -> Result<Device> {
        let mut devices = self.devices_mut();
        let device = devices
            .get_mut(device_id)
            .ok_or_else(Error::device_not_found)?;
        device.apply(changes);
        Ok(device.clone())
    }

    fn delete(&self, device_id: &str) -> Result<()> {
        self.devices_mut()
            .remove(device_id)
            .map(|_| ())
            .ok_or_else(Error::device_not_found)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.devices_mut().len())
    }
}

impl RecordStore for MemoryStore {
    fn insert(&self, reading: NewReading) -> Result<TelemetryRecord> {
        let mut records = self.records_mut();
        // Allocate under the records lock so ids stay in append order.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = reading.into_record(id);
        records.push(record.clone());
        Ok(record)
    }

    fn by_device(&self, device_id: &str) -> Result<Vec<TelemetryRecord>> {
        Ok(self
            .records_mut()
            .iter()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<TelemetryRecord>> {
        Ok(self.records_mut().clone())
    }

    fn get(&self, id: i64) -> Result<Option<TelemetryRecord>> {
        Ok(self.records_mut().iter().find(|r| r.id == id).cloned())
    }

    fn update(&self, id: i64, changes: &ReadingChanges) -> Result<TelemetryRecord> {
        let mut records = self.records_mut();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(Error::record_not_found)?;
        record.apply(changes);
        Ok(record.clone())
    }

    fn delete(&self, id: i64) -> Result<()> {
        let mut records = self.records_mut();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(Error::record_not_found());
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records_mut().len())
    }
}
