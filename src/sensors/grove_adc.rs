use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::{SensorDataFrame, SensorDriver};
use crate::bus::i2c::I2cBus;
use crate::codec::{self, ByteOrder};
use crate::errors::{I2cResult, SensorError, SensorResult};

// Command bytes understood by the board firmware
const ANALOG_READ: u8 = 0x03;
const PIN_MODE: u8 = 0x05;
const READ_FIRMWARE_VERSION: u8 = 0x08;

// The board exposes three analog ports, A0 through A2
const LAST_ANALOG_PIN: u8 = 2;

// The board NACKs while its firmware is busy; a short bounded retry
// rides that out. Longer backoff policy belongs to whoever calls us.
const READ_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input = 0,
    Output = 1,
}

pub struct GroveAdc {
    id: String,
    address: u8,
    bus_id: String,
    pin: u8,
}

impl GroveAdc {
    pub fn new(id: String, address: u8, bus_id: String, pin: u8) -> SensorResult<Self> {
        if pin > LAST_ANALOG_PIN {
            return Err(SensorError::Config {
                sensor: id,
                reason: format!("analog pin {pin} out of range, board has A0..=A{LAST_ANALOG_PIN}"),
            });
        }
        Ok(Self {
            id,
            address,
            bus_id,
            pin,
        })
    }

    fn pin_mode(&self, bus: &mut I2cBus, mode: PinMode) -> I2cResult<()> {
        bus.write(&[PIN_MODE, self.pin, mode as u8, 0])
    }

    fn firmware_version(&self, bus: &mut I2cBus) -> I2cResult<[u8; 3]> {
        let reply = bus.read(Some(READ_FIRMWARE_VERSION), 4)?;
        Ok([reply[1], reply[2], reply[3]])
    }

    /// One analog sample. The reply is a pad byte followed by the
    /// big-endian 10-bit value.
    async fn analog_read(&self, bus: &mut I2cBus) -> SensorResult<u16> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = (|| -> I2cResult<u16> {
                bus.write(&[ANALOG_READ, self.pin, 0, 0])?;
                let reply = bus.read(None, 3)?;
                Ok(codec::decode_u16([reply[1], reply[2]], ByteOrder::BigEndian))
            })();

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_absent() && attempt < READ_ATTEMPTS => {
                    debug!("[{}] busy on attempt {}: {}", self.id, attempt, err);
                    sleep(RETRY_DELAY).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[async_trait]
impl SensorDriver for GroveAdc {
    async fn init(&mut self, bus: &mut I2cBus) -> SensorResult<()> {
        bus.set_follower(self.address)?;

        let version = self.firmware_version(bus).map_err(|e| SensorError::Init {
            sensor: self.id.clone(),
            reason: format!("firmware version read failed: {e}"),
        })?;
        info!(
            "[{}] board firmware v{}.{}.{}",
            self.id, version[0], version[1], version[2]
        );

        self.pin_mode(bus, PinMode::Input)?;
        Ok(())
    }

    async fn read(&self, bus: &mut I2cBus) -> SensorResult<SensorDataFrame> {
        // Another driver may have re-addressed the shared handle since
        // our last cycle.
        bus.set_follower(self.address)?;
        let value = self.analog_read(bus).await?;

        Ok(SensorDataFrame {
            analog: Some((self.pin, value)),
            ..Default::default()
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn bus(&self) -> &str {
        &self.bus_id
    }

    fn address(&self) -> u8 {
        self.address
    }
}
