use serde::Deserialize;
use std::fs;

use crate::errors::{ConfigError, ConfigResult};

/// Root configuration struct expecting `[[sensor]]` TOML array format
#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorEntry>,
}

/// One sensor entry, matching each `[[sensor]]` section
#[derive(Debug, Deserialize)]
pub struct SensorEntry {
    pub id: String,
    pub driver: String,
    pub bus: String,
    pub address: u8,
    /// Poll frequency in Hz; drivers fall back to 1 Hz.
    pub frequency: Option<u32>,
    /// Board pin for analog drivers.
    pub pin: Option<u8>,
}

/// Loads config from TOML file
pub fn load_sensor_config(path: &str) -> ConfigResult<SensorConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Load {
        path: path.to_string(),
        source,
    })?;
    let parsed: SensorConfig = toml::from_str(&content)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sensor_entries() {
        let config: SensorConfig = toml::from_str(
            r#"
            [[sensor]]
            id = "air0"
            driver = "sgp30"
            bus = "i2c1"
            address = 88
            frequency = 1

            [[sensor]]
            id = "oxygen0"
            driver = "grove_adc"
            bus = "i2c1"
            address = 4
            pin = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.sensors[0].address, 0x58);
        assert_eq!(config.sensors[0].frequency, Some(1));
        assert_eq!(config.sensors[1].pin, Some(0));
        assert_eq!(config.sensors[1].frequency, None);
    }
}
