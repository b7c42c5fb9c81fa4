use tracing::error;

use grove_sensorhub::{init_tracing, run_sensor_hub};

#[tokio::main]
async fn main() {
    // RUST_LOG=debug for verbose, RUST_LOG=info for normal, RUST_LOG=warn for production
    init_tracing();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
    if let Err(err) = run_sensor_hub(&config_path).await {
        error!("[main] {err}");
        std::process::exit(1);
    }
}
