//! CLI for sensorhub, a small IoT telemetry backend.

mod commands;

use clap::{Parser, Subcommand};
use env_logger::Env;

#[derive(Parser)]
#[command(name = "sensorhub")]
#[command(about = "sensorhub: device registry and sensor telemetry over HTTP")]
#[command(version = sensorhub_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP telemetry server
    Serve {
        /// Host to bind to
        #[arg(long, env = "SENSORHUB_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, env = "SENSORHUB_PORT", default_value = "5000")]
        port: u16,

        /// Storage backend: sqlite (durable, default) or memory (lost on exit)
        #[arg(long, env = "SENSORHUB_STORAGE", default_value = "sqlite", value_parser = ["memory", "sqlite"])]
        storage: String,

        /// SQLite database file (ignored with --storage memory)
        #[arg(long, env = "SENSORHUB_DATABASE", default_value = "sensorhub.db")]
        database: String,

        /// Seed the in-memory registry with a sample device
        #[arg(long)]
        demo_device: bool,
    },

    /// List registered devices from a SQLite database
    Devices {
        /// SQLite database file
        #[arg(long, env = "SENSORHUB_DATABASE", default_value = "sensorhub.db")]
        database: String,
    },

    /// List stored telemetry readings from a SQLite database
    Telemetry {
        /// SQLite database file
        #[arg(long, env = "SENSORHUB_DATABASE", default_value = "sensorhub.db")]
        database: String,

        /// Only show readings from this device
        #[arg(long)]
        device: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            storage,
            database,
            demo_device,
        } => {
            let storage = commands::serve::storage_config(&storage, &database, demo_device);
            commands::serve::run(&host, port, &storage);
        }
        Commands::Devices { database } => commands::devices::run(&database),
        Commands::Telemetry {
            database,
            device,
            json,
        } => commands::telemetry::run(&database, device.as_deref(), json),
    }
}
