//! `sensorhub telemetry`: dump stored readings from a SQLite database.

use sensorhub_core::{RecordStore, TelemetryRecord, format_timestamp};

use super::{cell, open_existing};

/// Run the telemetry command.
pub fn run(database: &str, device: Option<&str>, json: bool) {
    let store = open_existing(database);
    let records = match device {
        Some(id) => store.by_device(id),
        None => store.all(),
    };
    let records = match records {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to read telemetry from {database}: {e}");
            std::process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&records) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to encode telemetry: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if records.is_empty() {
        match device {
            Some(id) => println!("No readings for {id} in {database}"),
            None => println!("No readings stored in {database}"),
        }
        return;
    }
    print!("{}", render(&records));
    println!("\n{} reading(s)", records.len());
}

fn render(records: &[TelemetryRecord]) -> String {
    let mut out = format!(
        "{:>6}  {:<20} {:<28} {:>8} {:>8} {:>8}\n",
        "ID", "DEVICE", "TIMESTAMP", "TEMP", "HUMID", "BATT"
    );
    out.push_str(&format!("{}\n", "-".repeat(84)));
    for r in records {
        out.push_str(&format!(
            "{:>6}  {:<20} {:<28} {:>8} {:>8} {:>8}\n",
            r.id,
            r.device_id,
            format_timestamp(&r.timestamp),
            cell(r.temperature),
            cell(r.humidity),
            cell(r.battery)
        ));
    }
    out
}
