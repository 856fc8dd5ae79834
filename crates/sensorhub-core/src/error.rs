//! Error kinds shared by the ingestion pipeline and both store backends.

use thiserror::Error;

/// Errors surfaced by registry, ingestion and record-store operations.
///
/// Every variant maps to a 4xx response at the HTTP layer; none of them is
/// fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or a value cannot be stored.
    #[error("{0}")]
    Validation(String),

    /// Unknown device id or record id.
    #[error("{0}")]
    NotFound(&'static str),

    /// Storage-layer failure. The transactional backend has already rolled
    /// back by the time this is returned.
    #[error("{0}")]
    Persistence(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn device_not_found() -> Self {
        Self::NotFound("Device not found")
    }

    pub fn record_not_found() -> Self {
        Self::NotFound("Record not found")
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
