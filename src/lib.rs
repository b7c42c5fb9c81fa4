//! Grove SensorHub: reads Grove air-quality sensors over the Linux
//! I2C character-device interface and logs their readings.
//!
//! The transport core ([`bus`]) owns the `/dev/i2c-*` handles and the
//! three transport strategies (raw stream, combined message
//! transactions, SMBus); [`checksum`] and [`codec`] validate and decode
//! what comes back; the [`sensors`] drivers turn that into readings.

// Public modules
pub mod bus;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod errors;
pub mod messages;
pub mod registry;
pub mod scheduler;
pub mod sensors;

// Re-export commonly used types
pub use bus::i2c::I2cBus;
pub use checksum::Crc8;
pub use codec::ByteOrder;
pub use config::{load_bus_config, load_sensor_config};
pub use errors::{I2cError, I2cResult, SensorError, SensorResult};
pub use registry::init_all;
pub use scheduler::spawn_sensor_tasks;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Run the Grove SensorHub with the given configuration path
pub async fn run_sensor_hub(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("[GroveSensorHub] starting up...");

    // Load configuration
    let bus_config = load_bus_config(&format!("{config_path}/buses.toml"))?;
    let sensor_config = load_sensor_config(&format!("{config_path}/sensors.toml"))?;
    info!(
        "[config] loaded {} bus(es), {} sensor(s)",
        bus_config.buses.len(),
        sensor_config.sensors.len()
    );

    // Open buses, scan them, and bring the sensors up
    let (sensors, buses) = init_all(&bus_config, &sensor_config).await?;
    info!("[registry] sensors and buses initialized");

    // Spawn the polling tasks
    spawn_sensor_tasks(sensors, buses, &sensor_config).await;
    info!("[main] sensor tasks launched");

    tokio::signal::ctrl_c().await?;
    info!("[main] shutting down");
    Ok(())
}
