//! `/telemetry` handlers: ingestion, queries and per-record mutation.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

use sensorhub_core::{Error, TelemetryRecord, ingest};

use crate::AppState;
use crate::error::AppError;
use crate::payload::{self, Payload};

#[derive(Serialize)]
pub(crate) struct DeviceTelemetryResponse {
    status: &'static str,
    device_id: String,
    telemetry: Vec<TelemetryRecord>,
}

#[derive(Serialize)]
pub(crate) struct AllTelemetryResponse {
    status: &'static str,
    total: usize,
    telemetry: Vec<TelemetryRecord>,
}

pub(crate) async fn ping() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Telemetry endpoint is ready. Send POST request with data.",
    }))
}

pub(crate) async fn receive(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let reading = ingest::normalize(payload, Utc::now())?;
    let record = state.records.insert(reading)?;
    log::info!("Stored reading #{} from {}", record.id, record.device_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Telemetry data received",
            "telemetry": record,
        })),
    ))
}

pub(crate) async fn by_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceTelemetryResponse>, AppError> {
    let telemetry = state.records.by_device(&device_id)?;
    Ok(Json(DeviceTelemetryResponse {
        status: "success",
        device_id,
        telemetry,
    }))
}

pub(crate) async fn all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AllTelemetryResponse>, AppError> {
    let telemetry = state.records.all()?;
    Ok(Json(AllTelemetryResponse {
        status: "success",
        total: telemetry.len(),
        telemetry,
    }))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let id = record_id(&id)?;
    if state.records.get(id)?.is_none() {
        return Err(Error::record_not_found().into());
    }
    let changes = ingest::reading_changes(&payload::parse(&body)?)?;
    if changes.is_empty() {
        log::debug!("Update of reading #{id} carried no measurement fields");
    }
    let record = state.records.update(id, &changes)?;
    log::info!("Updated reading #{id}");
    Ok(Json(json!({
        "status": "success",
        "message": "Record updated",
        "data": record,
    })))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = record_id(&id)?;
    state.records.delete(id)?;
    log::info!("Deleted reading #{id}");
    Ok(Json(json!({ "status": "success", "message": "Record deleted" })))
}

/// Only unsigned decimal ids can name a record.
fn record_id(raw: &str) -> Result<i64, Error> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::record_not_found());
    }
    raw.parse().map_err(|_| Error::record_not_found())
}
