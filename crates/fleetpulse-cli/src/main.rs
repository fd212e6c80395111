//! CLI for fleetpulse — device uptime and upload statistics over HTTP.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fleetpulse")]
#[command(about = "fleetpulse — device heartbeat uptime and upload latency server")]
#[command(version = fleetpulse_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the device roster and serve the HTTP API until Ctrl-C
    Serve {
        /// Device roster CSV (header row, device ID in the first column)
        #[arg(long, default_value = "devices.csv")]
        devices: String,

        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Parse the device roster and list the devices it registers
    Roster {
        /// Device roster CSV (header row, device ID in the first column)
        #[arg(long, default_value = "devices.csv")]
        devices: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            devices,
            host,
            port,
        } => commands::serve::run(&devices, &host, port),
        Commands::Roster { devices } => commands::roster::run(&devices),
    }
}
