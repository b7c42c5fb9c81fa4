use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::bus::i2c::I2cBus;
use crate::bus::scan::{self, ScanPolicy};
use crate::config::bus_config::BusConfig;
use crate::config::sensor_config::SensorConfig;
use crate::errors::{I2cResult, RegistryError, RegistryResult, SensorError};
use crate::sensors::{create_sensor_driver, SensorDriver};

/// Opens the configured buses, optionally scans them, and brings every
/// configured sensor through its init sequence.
pub async fn init_all(
    bus_config: &BusConfig,
    sensor_config: &SensorConfig,
) -> RegistryResult<(
    Vec<Box<dyn SensorDriver + Send>>,
    HashMap<String, Arc<Mutex<I2cBus>>>,
)> {
    let mut bus_map = HashMap::new();
    let mut responding: HashMap<String, Vec<u8>> = HashMap::new();

    for entry in bus_config.buses.iter() {
        if entry.r#type != "i2c" {
            warn!(
                "[registry] bus '{}' has unsupported type '{}', skipping",
                entry.id, entry.r#type
            );
            continue;
        }
        let mut bus = I2cBus::open_path(&entry.path).map_err(|source| RegistryError::BusOpen {
            bus: entry.id.clone(),
            source,
        })?;

        if entry.scan {
            let policy = ScanPolicy::default();
            match scan::scan(&mut bus, &policy).collect::<I2cResult<Vec<u8>>>() {
                Ok(found) => {
                    let listing: Vec<String> =
                        found.iter().map(|a| format!("0x{a:02x}")).collect();
                    info!(
                        "[registry] bus '{}': {} device(s) responding [{}]",
                        entry.id,
                        found.len(),
                        listing.join(", ")
                    );
                    responding.insert(entry.id.clone(), found);
                }
                Err(err) => warn!("[registry] bus '{}' scan failed: {}", entry.id, err),
            }
        }

        bus_map.insert(entry.id.clone(), Arc::new(Mutex::new(bus)));
    }

    let mut sensors: Vec<Box<dyn SensorDriver + Send>> = Vec::new();
    info!(
        "[registry] initializing {} sensor(s)...",
        sensor_config.sensors.len()
    );
    for entry in sensor_config.sensors.iter() {
        let mut sensor = create_sensor_driver(entry).map_err(RegistryError::DriverCreation)?;
        info!(
            "[registry] registering sensor: id={} driver={} bus={} address=0x{:02x}",
            entry.id, entry.driver, entry.bus, entry.address
        );

        if let Some(found) = responding.get(&entry.bus) {
            if !found.contains(&entry.address) {
                warn!(
                    "[registry] sensor '{}' at 0x{:02x} did not answer the bus scan",
                    entry.id, entry.address
                );
            }
        }

        let bus_arc = bus_map.get(&entry.bus).ok_or_else(|| {
            RegistryError::DriverCreation(SensorError::BusNotFound {
                bus: entry.bus.clone(),
            })
        })?;
        let mut bus = bus_arc.lock().await;
        sensor
            .init(&mut bus)
            .await
            .map_err(RegistryError::Registration)?;
        sensors.push(sensor);
    }

    Ok((sensors, bus_map))
}
