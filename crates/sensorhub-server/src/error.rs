use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use sensorhub_core::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Core(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Core(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Core(Error::Persistence(_)) => StatusCode::BAD_REQUEST,
            AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Core(Error::Persistence(msg)) => log::warn!("Storage failure: {msg}"),
            other => log::debug!("Request rejected ({status}): {other}"),
        }

        (
            status,
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}
