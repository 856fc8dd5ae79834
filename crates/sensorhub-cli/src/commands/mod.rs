pub mod devices;
pub mod serve;
pub mod telemetry;

use std::path::Path;

use sensorhub_core::SqliteStore;

/// Open an existing SQLite database for inspection, or exit.
pub fn open_existing(database: &str) -> SqliteStore {
    if !Path::new(database).exists() {
        eprintln!("No database found at {database}");
        eprintln!("Start the server first: sensorhub serve --database {database}");
        std::process::exit(1);
    }
    match SqliteStore::open(database) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open {database}: {e}");
            std::process::exit(1);
        }
    }
}

/// Table cell for an optional value.
pub fn cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
