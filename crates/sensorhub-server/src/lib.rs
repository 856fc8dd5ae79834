//! HTTP telemetry server.
//!
//! Devices register themselves under `/devices` and push readings to
//! `/telemetry/`. Every response is a JSON object with a `status` field
//! (`success` / `error`); errors also carry a human-readable `message`.

mod devices;
pub mod error;
pub mod payload;
mod telemetry;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::{delete, get, put},
};
use serde_json::{Value, json};

use sensorhub_core::{DeviceRegistry, RecordStore, Stores};

use crate::error::AppError;

/// Shared server state.
pub(crate) struct AppState {
    devices: Arc<dyn DeviceRegistry>,
    records: Arc<dyn RecordStore>,
}

/// Where to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "status": "success",
        "name": "sensorhub",
        "version": sensorhub_core::VERSION,
        "device_count": state.devices.count()?,
        "telemetry_count": state.records.count()?,
    })))
}

async fn handle_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let devices: Vec<String> = state
        .devices
        .list()?
        .into_iter()
        .map(|d| d.device_id)
        .collect();
    Ok(Json(json!({ "status": "success", "devices": devices })))
}

async fn handle_not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "message": "Not found" })),
    )
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let t0 = Instant::now();
    let res = next.run(req).await;
    log::info!(
        "{method} {path} -> {} ({:.1?})",
        res.status().as_u16(),
        t0.elapsed()
    );
    res
}

/// Build the axum router over the given stores.
pub fn build_router(stores: Stores) -> Router {
    let state = Arc::new(AppState {
        devices: stores.devices,
        records: stores.records,
    });

    let telemetry_root = get(telemetry::ping).post(telemetry::receive);

    Router::new()
        .route("/", get(handle_index))
        .route("/dashboard", get(handle_dashboard))
        .route("/dashboard/", get(handle_dashboard))
        .route("/devices", get(devices::list))
        .route("/devices/", get(devices::list))
        .route("/devices/add", get(devices::add_form).post(devices::add))
        .route(
            "/devices/{device_id}/edit",
            get(devices::show).post(devices::edit),
        )
        .route("/devices/{device_id}/delete", delete(devices::remove))
        .route("/telemetry", telemetry_root.clone())
        .route("/telemetry/", telemetry_root)
        .route("/telemetry/all", get(telemetry::all))
        .route("/telemetry/{device_id}", get(telemetry::by_device))
        .route(
            "/telemetry/id/{id}",
            put(telemetry::update).delete(telemetry::remove),
        )
        .fallback(handle_not_found)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C or SIGTERM.
pub async fn run_server(config: &ServerConfig, stores: Stores) -> std::io::Result<()> {
    let app = build_router(stores);
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
