//! `sensorhub devices`: list the device registry of a SQLite database.

use sensorhub_core::{Device, DeviceRegistry};

use super::{cell, open_existing};

/// Run the devices command.
pub fn run(database: &str) {
    let store = open_existing(database);
    let devices = match store.list() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to read devices from {database}: {e}");
            std::process::exit(1);
        }
    };

    if devices.is_empty() {
        println!("No devices registered in {database}");
        println!("Register one: curl -X POST <server>/devices/add -d device_id=sensor001");
        return;
    }
    print!("{}", render(&devices));
    println!("\n{} device(s)", devices.len());
}

fn render(devices: &[Device]) -> String {
    let mut out = format!("{:<20} {:<32} {}\n", "DEVICE", "NAME", "LOCATION");
    out.push_str(&format!("{}\n", "-".repeat(72)));
    for d in devices {
        out.push_str(&format!(
            "{:<20} {:<32} {}\n",
            d.device_id,
            cell(d.name.as_deref()),
            cell(d.location.as_deref())
        ));
    }
    out
}
