//! Request body decoding.
//!
//! Devices post either JSON or classic HTML-form bodies. JSON wins; a body
//! that is not JSON is decoded as `application/x-www-form-urlencoded`, whose
//! values are always strings. JSON `null` and an empty body both decode to
//! an empty mapping.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde_json::{Map, Value};

use sensorhub_core::{Error, Result};

use crate::error::AppError;

/// A decoded request body as a field → value mapping.
#[derive(Debug, Default)]
pub struct Payload(pub Map<String, Value>);

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::MalformedBody(e.body_text()))?;
        Ok(Payload(parse(&body)?))
    }
}

/// Decode a body, preferring JSON and falling back to form encoding.
pub fn parse(body: &[u8]) -> Result<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Err(_) => parse_form(body),
        Ok(other) => Err(Error::validation(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn parse_form(body: &[u8]) -> Result<Map<String, Value>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| Error::validation(format!("malformed form body: {e}")))?;
    Ok(pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
