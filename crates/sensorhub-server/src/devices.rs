//! `/devices` handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{Value, json};

use sensorhub_core::{AddOutcome, Device, Error, ingest};

use crate::AppState;
use crate::error::AppError;
use crate::payload::{self, Payload};

#[derive(Serialize)]
pub(crate) struct DeviceListResponse {
    status: &'static str,
    total: usize,
    devices: Vec<Device>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeviceListResponse>, AppError> {
    let devices = state.devices.list()?;
    Ok(Json(DeviceListResponse {
        status: "success",
        total: devices.len(),
        devices,
    }))
}

pub(crate) async fn add_form() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Send a POST request with device_id, name and location to register a device.",
        "fields": ["device_id", "name", "location"],
    }))
}

pub(crate) async fn add(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let device = ingest::new_device(&payload)?;
    match state.devices.add(device.clone())? {
        AddOutcome::Created => log::info!("Registered device {}", device.device_id),
        AddOutcome::Replaced => log::warn!(
            "Device {} registered again, previous metadata replaced",
            device.device_id
        ),
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "message": "Device added", "device": device })),
    ))
}

pub(crate) async fn show(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let device = state
        .devices
        .get(&device_id)?
        .ok_or_else(Error::device_not_found)?;
    Ok(Json(json!({ "status": "success", "device": device })))
}

pub(crate) async fn edit(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    // Unknown devices are a 404 whatever the body holds.
    if state.devices.get(&device_id)?.is_none() {
        return Err(Error::device_not_found().into());
    }
    let changes = ingest::device_changes(&payload::parse(&body)?);
    let device = state.devices.edit(&device_id, changes)?;
    log::info!("Updated device {device_id}");
    Ok(Json(json!({ "status": "success", "message": "Device updated", "device": device })))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.devices.delete(&device_id)?;
    log::info!("Deleted device {device_id}");
    Ok(Json(json!({ "status": "success", "message": "Device deleted" })))
}
