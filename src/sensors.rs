use async_trait::async_trait;

use crate::bus::i2c::I2cBus;
use crate::config::sensor_config::SensorEntry;
use crate::errors::{SensorError, SensorResult};

#[cfg(feature = "grove_adc")]
pub mod grove_adc;
#[cfg(feature = "hm3301")]
pub mod hm3301;
#[cfg(feature = "sgp30")]
pub mod sgp30;

/// One cycle's worth of readings from a single driver. Drivers fill in
/// only the fields their device produces.
#[derive(Debug, Default, Clone)]
pub struct SensorDataFrame {
    /// Equivalent CO2 in ppm
    pub eco2_ppm: Option<u16>,
    /// Total volatile organic compounds in ppb
    pub tvoc_ppb: Option<u16>,
    /// PM1.0 / PM2.5 / PM10 standard particulate in µg/m³
    pub pm_standard: Option<[u16; 3]>,
    /// PM1.0 / PM2.5 / PM10 atmospheric equivalent in µg/m³
    pub pm_atmospheric: Option<[u16; 3]>,
    /// Particles per liter of air with diameter above 0.3 / 0.5 / 1.0 /
    /// 2.5 / 5.0 / 10 µm
    pub particle_counts: Option<[u16; 6]>,
    /// Raw analog sample as (pin, value)
    pub analog: Option<(u8, u16)>,
}

#[async_trait]
pub trait SensorDriver: Send + Sync {
    async fn init(&mut self, bus: &mut I2cBus) -> SensorResult<()>;
    async fn read(&self, bus: &mut I2cBus) -> SensorResult<SensorDataFrame>;
    fn id(&self) -> &str;
    fn bus(&self) -> &str;
    fn address(&self) -> u8;
}

pub fn create_sensor_driver(entry: &SensorEntry) -> SensorResult<Box<dyn SensorDriver + Send>> {
    match entry.driver.as_str() {
        #[cfg(feature = "sgp30")]
        "sgp30" => Ok(Box::new(sgp30::Sgp30::new(
            entry.id.clone(),
            entry.address,
            entry.bus.clone(),
        ))),
        #[cfg(feature = "hm3301")]
        "hm3301" => Ok(Box::new(hm3301::Hm3301::new(
            entry.id.clone(),
            entry.address,
            entry.bus.clone(),
        ))),
        #[cfg(feature = "grove_adc")]
        "grove_adc" => {
            let pin = entry.pin.ok_or_else(|| SensorError::Config {
                sensor: entry.id.clone(),
                reason: "grove_adc requires a 'pin' entry".to_string(),
            })?;
            Ok(Box::new(grove_adc::GroveAdc::new(
                entry.id.clone(),
                entry.address,
                entry.bus.clone(),
                pin,
            )?))
        }
        _ => Err(SensorError::UnsupportedDriver {
            driver: entry.driver.clone(),
        }),
    }
}
