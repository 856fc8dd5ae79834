//! SQLite-backed store.
//!
//! # Schema
//!
//! - `telemetry`: one row per reading, `id` assigned by SQLite
//!   (`AUTOINCREMENT`, so ids are never reused after a delete)
//! - `devices`: one row per registered device, keyed by `device_id`
//!
//! No foreign key joins the two tables; readings for unknown or deleted
//! devices are kept.
//!
//! Each mutation runs in its own transaction. Any failure rolls the
//! transaction back before the error is returned.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use crate::error::{Error, Result};
use crate::model::{
    AddOutcome, Device, DeviceChanges, Measurement, NewReading, ReadingChanges, TelemetryRecord,
};

use super::{DeviceRegistry, RecordStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS telemetry (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        device_id   VARCHAR(50) NOT NULL,
        timestamp   DATETIME,
        temperature FLOAT,
        humidity    FLOAT,
        battery     INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_telemetry_device ON telemetry(device_id);
    CREATE TABLE IF NOT EXISTS devices (
        device_id TEXT PRIMARY KEY,
        name      TEXT,
        location  TEXT
    );";

const RECORD_COLUMNS: &str = "id, device_id, timestamp, temperature, humidity, battery";

/// Relational registry and record store on a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Persistence(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("{}: journal_mode={mode}", path.display());
        Self::init(conn)
    }

    /// A private database that disappears with the store.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` in a transaction, committing on success and rolling back on
    /// any error.
    fn in_transaction<T>(
        &self,
        op: &str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    log::warn!("{op}: rollback failed: {rb}");
                }
                if matches!(e, Error::Persistence(_)) {
                    log::warn!("{op}: rolled back: {e}");
                }
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

impl ToSql for Measurement {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            Measurement::Integer(i) => ToSqlOutput::from(i),
            Measurement::Float(f) => ToSqlOutput::from(f),
        })
    }
}

impl FromSql for Measurement {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(Measurement::Integer(i)),
            ValueRef::Real(f) => Ok(Measurement::Float(f)),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TelemetryRecord> {
    Ok(TelemetryRecord {
        id: row.get(0)?,
        device_id: row.get(1)?,
        timestamp: row.get(2)?,
        temperature: row.get(3)?,
        humidity: row.get(4)?,
        battery: row.get(5)?,
    })
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        device_id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
    })
}

fn select_record(conn: &Connection, id: i64) -> Result<Option<TelemetryRecord>> {
    let record = conn
        .prepare_cached(&format!("SELECT {RECORD_COLUMNS} FROM telemetry WHERE id = ?1"))?
        .query_row([id], record_from_row)
        .optional()?;
    Ok(record)
}

fn select_device(conn: &Connection, device_id: &str) -> Result<Option<Device>> {
    let device = conn
        .prepare_cached("SELECT device_id, name, location FROM devices WHERE device_id = ?1")?
        .query_row([device_id], device_from_row)
        .optional()?;
    Ok(device)
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or(0))
}

// ---------------------------------------------------------------------------
// Device registry
// ---------------------------------------------------------------------------

impl DeviceRegistry for SqliteStore {
    fn list(&self) -> Result<Vec<Device>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare_cached("SELECT device_id, name, location FROM devices ORDER BY device_id")?;
        let devices = stmt
            .query_map([], device_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(devices)
    }

    fn get(&self, device_id: &str) -> Result<Option<Device>> {
        select_device(&self.conn(), device_id)
    }

    fn add(&self, device: Device) -> Result<AddOutcome> {
        self.in_transaction("add device", |tx| {
            let existed = select_device(tx, &device.device_id)?.is_some();
            tx.prepare_cached(
                "INSERT INTO devices (device_id, name, location) VALUES (?1, ?2, ?3)
                 ON CONFLICT(device_id) DO UPDATE SET
                    name = excluded.name,
                    location = excluded.location",
            )?
            .execute(params![device.device_id, device.name, device.location])?;
            Ok(if existed {
                AddOutcome::Replaced
            } else {
                AddOutcome::Created
            })
        })
    }

    fn edit(&self, device_id: &str, changes: DeviceChanges) -> Result<Device> {
        self.in_transaction("edit device", |tx| {
            let mut device = select_device(tx, device_id)?.ok_or_else(Error::device_not_found)?;
            device.apply(changes);
            tx.prepare_cached("UPDATE devices SET name = ?1, location = ?2 WHERE device_id = ?3")?
                .execute(params![device.name, device.location, device_id])?;
            Ok(device)
        })
    }

    fn delete(&self, device_id: &str) -> Result<()> {
        self.in_transaction("delete device", |tx| {
            let n = tx
                .prepare_cached("DELETE FROM devices WHERE device_id = ?1")?
                .execute([device_id])?;
            if n == 0 {
                return Err(Error::device_not_found());
            }
            Ok(())
        })
    }

    fn count(&self) -> Result<usize> {
        count_rows(&self.conn(), "devices")
    }
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

impl RecordStore for SqliteStore {
    fn insert(&self, reading: NewReading) -> Result<TelemetryRecord> {
        self.in_transaction("insert telemetry", |tx| {
            tx.prepare_cached(
                "INSERT INTO telemetry (device_id, timestamp, temperature, humidity, battery)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                reading.device_id,
                reading.timestamp,
                reading.temperature,
                reading.humidity,
                reading.battery
            ])?;
            let id = tx.last_insert_rowid();
            // Read back so the caller sees column affinity applied.
            select_record(tx, id)?
                .ok_or_else(|| Error::Persistence(format!("inserted row {id} vanished")))
        })
    }

    fn by_device(&self, device_id: &str) -> Result<Vec<TelemetryRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RECORD_COLUMNS} FROM telemetry WHERE device_id = ?1 ORDER BY id"
        ))?;
        let records = stmt
            .query_map([device_id], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn all(&self) -> Result<Vec<TelemetryRecord>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {RECORD_COLUMNS} FROM telemetry ORDER BY id"))?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn get(&self, id: i64) -> Result<Option<TelemetryRecord>> {
        select_record(&self.conn(), id)
    }

    fn update(&self, id: i64, changes: &ReadingChanges) -> Result<TelemetryRecord> {
        self.in_transaction("update telemetry", |tx| {
            let mut record = select_record(tx, id)?.ok_or_else(Error::record_not_found)?;
            record.apply(changes);
            tx.prepare_cached(
                "UPDATE telemetry SET temperature = ?1, humidity = ?2, battery = ?3 WHERE id = ?4",
            )?
            .execute(params![record.temperature, record.humidity, record.battery, id])?;
            select_record(tx, id)?.ok_or_else(Error::record_not_found)
        })
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.in_transaction("delete telemetry", |tx| {
            let n = tx
                .prepare_cached("DELETE FROM telemetry WHERE id = ?1")?
                .execute([id])?;
            if n == 0 {
                return Err(Error::record_not_found());
            }
            Ok(())
        })
    }

    fn count(&self) -> Result<usize> {
        count_rows(&self.conn(), "telemetry")
    }
}
