//! `sensorhub serve`: run the HTTP telemetry server.

use std::path::PathBuf;

use sensorhub_core::StorageConfig;
use sensorhub_server::ServerConfig;

/// Map the `--storage` / `--database` / `--demo-device` flags to a backend.
pub fn storage_config(kind: &str, database: &str, demo_device: bool) -> StorageConfig {
    match kind {
        "memory" => StorageConfig::Memory { demo_device },
        _ => {
            if demo_device {
                log::warn!("--demo-device only applies to --storage memory");
            }
            StorageConfig::Sqlite {
                path: PathBuf::from(database),
            }
        }
    }
}

/// Run the serve command.
pub fn run(host: &str, port: u16, storage: &StorageConfig) {
    let stores = match sensorhub_core::open(storage) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open storage ({storage}): {e}");
            std::process::exit(1);
        }
    };

    let config = ServerConfig {
        host: host.to_string(),
        port,
    };
    let base = format!("http://{host}:{port}");

    println!("sensorhub v{}", sensorhub_core::VERSION);
    println!("   {base}");
    println!("   storage: {storage}");
    println!();
    println!("   Endpoints:");
    println!("     GET    /                        Device and reading counts");
    println!("     GET    /dashboard/              Registered device ids");
    println!("     GET    /devices/                List devices");
    println!("     POST   /devices/add             Register a device");
    println!("     GET    /devices/<id>/edit       Show a device");
    println!("     POST   /devices/<id>/edit       Update name / location");
    println!("     DELETE /devices/<id>/delete     Remove a device");
    println!("     POST   /telemetry/              Ingest a reading (JSON or form)");
    println!("     GET    /telemetry/all           All readings");
    println!("     GET    /telemetry/<device_id>   Readings for one device");
    println!("     PUT    /telemetry/id/<id>       Update measurements");
    println!("     DELETE /telemetry/id/<id>       Delete a reading");
    println!();
    println!("   Example:");
    println!("     curl -X POST {base}/telemetry/ -H 'Content-Type: application/json' \\");
    println!("          -d '{{\"device_id\": \"sensor001\", \"temperature\": 21.5}}'");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(sensorhub_server::run_server(&config, stores)) {
        eprintln!("Server error on {}: {e}", config.address());
        std::process::exit(1);
    }
}
