//! Ingestion pipeline: turns a loosely typed payload into a storable reading.
//!
//! Steps, in order:
//! 1. all-digit strings become integers
//! 2. `device_id` must be present
//! 3. a missing `timestamp` defaults to the ingestion time
//! 4. `temperature`, `humidity` and `battery` are coerced to numbers
//!
//! The same field extraction backs device registration/edit and record
//! updates so every entry point treats payloads alike.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::coerce::{coerce_digit_strings, coerce_numeric};
use crate::error::{Error, Result};
use crate::model::{Device, DeviceChanges, MAX_DEVICE_ID_LEN, Measurement, NewReading, ReadingChanges};

/// Years that RFC 3339 can write with four digits.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 0..=9999;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Validate and normalize an inbound reading.
///
/// Keys other than `device_id`, `timestamp` and the measurement fields are
/// ignored.
pub fn normalize(mut payload: Map<String, Value>, now: DateTime<Utc>) -> Result<NewReading> {
    coerce_digit_strings(&mut payload);

    let device_id = required_device_id(payload.get("device_id"))?;

    let timestamp = match payload.get("timestamp") {
        None | Some(Value::Null) => now,
        Some(v) => parse_timestamp(v)?,
    };

    Ok(NewReading {
        device_id,
        timestamp,
        temperature: measurement(&payload, "temperature")?.flatten(),
        humidity: measurement(&payload, "humidity")?.flatten(),
        battery: measurement(&payload, "battery")?.flatten(),
    })
}

/// Extract the mutable measurement fields of an update request.
pub fn reading_changes(payload: &Map<String, Value>) -> Result<ReadingChanges> {
    Ok(ReadingChanges {
        temperature: measurement(payload, "temperature")?,
        humidity: measurement(payload, "humidity")?,
        battery: measurement(payload, "battery")?,
    })
}

/// Build a device from a registration payload.
pub fn new_device(payload: &Map<String, Value>) -> Result<Device> {
    let device_id = required_device_id(payload.get("device_id"))?;
    Ok(Device {
        device_id,
        name: payload.get("name").and_then(text_field),
        location: payload.get("location").and_then(text_field),
    })
}

/// Extract `name` / `location` edits, keeping absent and `null` apart.
pub fn device_changes(payload: &Map<String, Value>) -> DeviceChanges {
    DeviceChanges {
        name: payload.get("name").map(text_field),
        location: payload.get("location").map(text_field),
    }
}

/// Parse an explicit timestamp.
///
/// Accepts RFC 3339, naive ISO 8601 (taken as UTC) or integer Unix seconds.
/// The year must lie in 0000..=9999.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NAIVE_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };
    parsed
        .filter(|ts| YEAR_RANGE.contains(&ts.year()))
        .ok_or_else(|| Error::validation(format!("invalid timestamp: {value}")))
}

pub fn validate_device_id(device_id: &str) -> Result<()> {
    if device_id.chars().count() > MAX_DEVICE_ID_LEN {
        return Err(Error::validation(format!(
            "device_id longer than {MAX_DEVICE_ID_LEN} characters"
        )));
    }
    Ok(())
}

fn required_device_id(value: Option<&Value>) -> Result<String> {
    let device_id = match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Number(_)) => {
            return Err(Error::validation("device_id required"));
        }
        Some(Value::Bool(false)) => return Err(Error::validation("device_id required")),
        Some(other) => {
            return Err(Error::validation(format!(
                "device_id must be a string, got {other}"
            )));
        }
    };
    validate_device_id(&device_id)?;
    Ok(device_id)
}

/// `None` when the field is absent, `Some(None)` for an explicit `null`.
fn measurement(payload: &Map<String, Value>, field: &str) -> Result<Option<Option<Measurement>>> {
    payload
        .get(field)
        .map(|v| Measurement::from_value(field, &coerce_numeric(v)))
        .transpose()
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
