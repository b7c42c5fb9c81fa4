use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::bus::i2c::I2cBus;
use crate::config::sensor_config::SensorConfig;
use crate::messages::{
    AirQualityMessage, AnalogMessage, Header, ParticulateMessage, SensorMessage,
};
use crate::sensors::{SensorDataFrame, SensorDriver};

const DEVICE_ID: &str = "grove_hub";

/// Spawns one polling task per sensor at its configured frequency.
pub async fn spawn_sensor_tasks(
    sensors: Vec<Box<dyn SensorDriver + Send>>,
    buses: HashMap<String, Arc<Mutex<I2cBus>>>,
    sensor_config: &SensorConfig,
) {
    for sensor in sensors.into_iter() {
        let sensor_id = sensor.id().to_string();
        let Some(bus) = buses.get(sensor.bus()).cloned() else {
            warn!(
                "[scheduler] no bus '{}' for sensor '{}', not scheduling",
                sensor.bus(),
                sensor_id
            );
            continue;
        };

        let frequency = sensor_config
            .sensors
            .iter()
            .find(|s| s.id == sensor_id)
            .and_then(|s| s.frequency)
            .unwrap_or(1); // Air sensors settle at 1Hz
        let sleep_duration = Duration::from_millis((1000.0 / frequency as f32) as u64);
        let mut seq = 0u64;

        tokio::spawn(async move {
            info!("[{}] starting sensor task at {}Hz", sensor_id, frequency);

            loop {
                let mut bus_lock = bus.lock().await;
                let result = sensor.read(&mut bus_lock).await;
                drop(bus_lock); // Release lock early

                match result {
                    Ok(frame) => {
                        seq += 1;
                        for message in frame_to_messages(&sensor_id, seq, &frame) {
                            log_reading(&message);
                        }
                    }
                    Err(err) => {
                        warn!("[{}] sensor read error: {}", sensor_id, err);
                    }
                }

                sleep(sleep_duration).await;
            }
        });
    }
}

fn frame_to_messages(sensor_id: &str, seq: u64, frame: &SensorDataFrame) -> Vec<SensorMessage> {
    let mut messages = Vec::new();

    if let (Some(eco2_ppm), Some(tvoc_ppb)) = (frame.eco2_ppm, frame.tvoc_ppb) {
        messages.push(SensorMessage::AirQuality(AirQualityMessage {
            h: Header::new(DEVICE_ID.to_string(), sensor_id.to_string(), seq),
            eco2_ppm,
            tvoc_ppb,
        }));
    }

    if let (Some(standard), Some(atmospheric), Some(particle_counts)) = (
        frame.pm_standard,
        frame.pm_atmospheric,
        frame.particle_counts,
    ) {
        messages.push(SensorMessage::Particulate(ParticulateMessage {
            h: Header::new(DEVICE_ID.to_string(), sensor_id.to_string(), seq),
            standard,
            atmospheric,
            particle_counts,
        }));
    }

    if let Some((pin, value)) = frame.analog {
        messages.push(SensorMessage::Analog(AnalogMessage {
            h: Header::new(DEVICE_ID.to_string(), sensor_id.to_string(), seq),
            pin,
            value,
        }));
    }

    messages
}

fn log_reading(message: &SensorMessage) {
    match message {
        SensorMessage::AirQuality(m) => {
            info!("[{}] eCO₂: {:4}ppm tVOC: {:4}ppb", m.h.sensor_id, m.eco2_ppm, m.tvoc_ppb);
        }
        SensorMessage::Particulate(m) => {
            info!(
                "[{}] PM1.0: {:3} PM2.5: {:3} PM10: {:3} µg/m³",
                m.h.sensor_id, m.standard[0], m.standard[1], m.standard[2]
            );
        }
        SensorMessage::Analog(m) => {
            info!("[{}] pin A{}: {:4}", m.h.sensor_id, m.pin, m.value);
        }
    }
    if let Ok(json) = message.to_json() {
        debug!("[scheduler] {}", json);
    }
}
