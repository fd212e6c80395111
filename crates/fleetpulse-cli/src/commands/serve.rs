//! `fleetpulse serve` — load the roster and run the HTTP API.

use std::sync::Arc;

pub fn run(devices: &str, host: &str, port: u16) {
    let registry = Arc::new(super::load_registry(devices));

    let base = format!("http://{host}:{port}");
    let n_devices = registry.len();

    println!("📡 fleetpulse server v{}", fleetpulse_core::VERSION);
    println!("   {base}");
    println!("   {n_devices} devices loaded from {devices}");
    println!();
    println!("   Endpoints:");
    println!("     GET  /                                  Liveness (\"OK.\")");
    println!("     GET  /health                            Registry size");
    println!("     GET  /api/v1/devices                    Registered device IDs");
    println!("     POST /api/v1/devices/{{id}}/heartbeat     {{\"sent_at\": RFC 3339}}");
    println!("     POST /api/v1/devices/{{id}}/stats         {{\"sent_at\": ..., \"upload_time\": ns}}");
    println!("     GET  /api/v1/devices/{{id}}/stats         Uptime and average upload time");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(fleetpulse_server::run_server(registry, host, port)) {
        eprintln!("Server error on {host}:{port}: {e}");
        std::process::exit(1);
    }
}
