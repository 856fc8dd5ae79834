//! Storage abstractions for devices and telemetry records.
//!
//! Handlers only ever see the [`DeviceRegistry`] and [`RecordStore`] traits,
//! so the backend can be swapped without touching request handling:
//! - [`MemoryStore`]: process-local, mutex-guarded, lost on restart
//! - [`SqliteStore`]: relational table with autoincrement ids, one
//!   transaction per mutation

mod memory;
mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{AddOutcome, Device, DeviceChanges, NewReading, ReadingChanges, TelemetryRecord};

/// Key-value registry of device metadata.
pub trait DeviceRegistry: Send + Sync {
    /// All devices, ordered by `device_id`.
    fn list(&self) -> Result<Vec<Device>>;

    fn get(&self, device_id: &str) -> Result<Option<Device>>;

    /// Insert or overwrite a device.
    fn add(&self, device: Device) -> Result<AddOutcome>;

    /// Merge changes into an existing device. Fails with `NotFound`.
    fn edit(&self, device_id: &str, changes: DeviceChanges) -> Result<Device>;

    /// Remove a device. Its telemetry records are left in place.
    fn delete(&self, device_id: &str) -> Result<()>;

    fn count(&self) -> Result<usize>;
}

/// Persistent or transient store of telemetry records.
pub trait RecordStore: Send + Sync {
    /// Assign an id and persist a reading.
    fn insert(&self, reading: NewReading) -> Result<TelemetryRecord>;

    /// Records for one device, ordered by id. Empty when nothing matches.
    fn by_device(&self, device_id: &str) -> Result<Vec<TelemetryRecord>>;

    /// Every record, ordered by id.
    fn all(&self) -> Result<Vec<TelemetryRecord>>;

    fn get(&self, id: i64) -> Result<Option<TelemetryRecord>>;

    /// Apply measurement changes to a record. Fails with `NotFound`.
    fn update(&self, id: i64, changes: &ReadingChanges) -> Result<TelemetryRecord>;

    /// Remove a record. Fails with `NotFound`.
    fn delete(&self, id: i64) -> Result<()>;

    fn count(&self) -> Result<usize>;
}

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory { demo_device: bool },
    Sqlite { path: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory { demo_device: false }
    }
}

impl std::fmt::Display for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory { .. } => write!(f, "memory"),
            Self::Sqlite { path } => write!(f, "sqlite:{}", path.display()),
        }
    }
}

/// Registry and record store handles, cheap to clone into request state.
#[derive(Clone)]
pub struct Stores {
    pub devices: Arc<dyn DeviceRegistry>,
    pub records: Arc<dyn RecordStore>,
}

impl Stores {
    /// Use one backend value for both roles.
    pub fn shared<S>(store: S) -> Self
    where
        S: DeviceRegistry + RecordStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            devices: store.clone(),
            records: store,
        }
    }
}

/// Open the configured backend.
pub fn open(config: &StorageConfig) -> Result<Stores> {
    match config {
        StorageConfig::Memory { demo_device } => {
            let store = if *demo_device {
                MemoryStore::with_demo_device()
            } else {
                MemoryStore::new()
            };
            Ok(Stores::shared(store))
        }
        StorageConfig::Sqlite { path } => {
            log::info!("Opening SQLite store at {}", path.display());
            Ok(Stores::shared(SqliteStore::open(path)?))
        }
    }
}
