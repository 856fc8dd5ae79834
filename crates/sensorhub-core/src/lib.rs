//! # sensorhub-core
//!
//! Telemetry ingestion and storage for small IoT deployments.
//!
//! Devices register descriptive metadata (name, location) and push sensor
//! readings (temperature, humidity, battery). This crate validates and
//! normalizes those readings and stores both kinds of data behind two traits:
//!
//! - [`DeviceRegistry`]: `device_id` → [`Device`]
//! - [`RecordStore`]: autoincrement id → [`TelemetryRecord`]
//!
//! ## Quick Start
//!
//! ```
//! use sensorhub_core::{MemoryStore, RecordStore, ingest};
//!
//! let store = MemoryStore::new();
//! let payload = serde_json::json!({"device_id": "sensor001", "temperature": "21.5"});
//! let reading = ingest::normalize(
//!     payload.as_object().unwrap().clone(),
//!     chrono::Utc::now(),
//! )
//! .unwrap();
//! let record = store.insert(reading).unwrap();
//! assert_eq!(record.id, 1);
//! ```
//!
//! ## Pipeline
//!
//! Payload → digit coercion → `device_id` check → timestamp default →
//! numeric coercion → store
//!
//! Coercion is best-effort and never fails on its own; a value that is still
//! not a number when it reaches a numeric column is a validation error.

pub mod coerce;
pub mod error;
pub mod ingest;
pub mod model;
pub mod store;

pub use error::{Error, Result};
pub use model::{
    AddOutcome, Device, DeviceChanges, Measurement, NewReading, ReadingChanges, TelemetryRecord,
    format_timestamp,
};
pub use store::{
    DeviceRegistry, MemoryStore, RecordStore, SqliteStore, StorageConfig, Stores, open,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
