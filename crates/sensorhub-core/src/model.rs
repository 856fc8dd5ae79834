//! Devices, telemetry records and the partial-update shapes applied to them.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Longest accepted `device_id`, matching the `VARCHAR(50)` column.
pub const MAX_DEVICE_ID_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Descriptive metadata for a registered device. `device_id` never changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
}

impl Device {
    pub fn new(
        device_id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            name: Some(name.into()),
            location: Some(location.into()),
        }
    }

    /// Merge an edit into this device.
    pub fn apply(&mut self, changes: DeviceChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(location) = changes.location {
            self.location = location;
        }
    }
}

/// Edit request for a device.
///
/// Outer `None` leaves the field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceChanges {
    pub name: Option<Option<String>>,
    pub location: Option<Option<String>>,
}

/// Whether `DeviceRegistry::add` created a new entry or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    Replaced,
}

// ---------------------------------------------------------------------------
// Measurements
// ---------------------------------------------------------------------------

/// A numeric sensor value. Integers and floats are kept apart so that a
/// reading sent as `"80"` comes back as `80`, not `80.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measurement {
    Integer(i64),
    Float(f64),
}

impl Measurement {
    /// Convert an already-coerced JSON value into a storable measurement.
    ///
    /// `null` clears the field. Strings that survived coercion, booleans,
    /// arrays and objects cannot go into a numeric column.
    pub fn from_value(field: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(Self::Integer(i))),
                (None, Some(f)) => Ok(Some(Self::Float(f))),
                (None, None) => Err(Error::validation(format!(
                    "{field} must be numeric, got {n}"
                ))),
            },
            other => Err(Error::validation(format!(
                "{field} must be numeric, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Telemetry records
// ---------------------------------------------------------------------------

/// A stored sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub id: i64,
    pub device_id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<Measurement>,
    pub humidity: Option<Measurement>,
    pub battery: Option<Measurement>,
}

/// A normalized reading that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<Measurement>,
    pub humidity: Option<Measurement>,
    pub battery: Option<Measurement>,
}

impl NewReading {
    pub fn into_record(self, id: i64) -> TelemetryRecord {
        TelemetryRecord {
            id,
            device_id: self.device_id,
            timestamp: self.timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
            battery: self.battery,
        }
    }
}

/// Partial update of the mutable measurement fields of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingChanges {
    pub temperature: Option<Option<Measurement>>,
    pub humidity: Option<Option<Measurement>>,
    pub battery: Option<Option<Measurement>>,
}

impl ReadingChanges {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && self.battery.is_none()
    }
}

impl TelemetryRecord {
    pub fn apply(&mut self, changes: &ReadingChanges) {
        if let Some(v) = changes.temperature {
            self.temperature = v;
        }
        if let Some(v) = changes.humidity {
            self.humidity = v;
        }
        if let Some(v) = changes.battery {
            self.battery = v;
        }
    }
}

/// ISO-8601 / RFC 3339 with microseconds and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(ts))
}
