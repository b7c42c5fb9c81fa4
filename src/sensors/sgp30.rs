use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::info;

use super::{SensorDataFrame, SensorDriver};
use crate::bus::i2c::I2cBus;
use crate::checksum::Crc8;
use crate::codec::{self, ByteOrder};
use crate::errors::{SensorError, SensorResult};

/// One entry of the SGP30 command set: the two command bytes, the reply
/// length on the wire (checksum bytes included), and the worst-case
/// processing time before the reply may be fetched.
struct Command {
    bytes: [u8; 2],
    read_len: usize,
    wait_ms: u64,
}

// SGP30 datasheet, feature set 0x22 command table
const IAQ_INIT: Command = Command { bytes: [0x20, 0x03], read_len: 0, wait_ms: 10 };
const MEASURE_IAQ: Command = Command { bytes: [0x20, 0x08], read_len: 6, wait_ms: 12 };
const GET_FEATURE_SET: Command = Command { bytes: [0x20, 0x2F], read_len: 3, wait_ms: 10 };
const GET_TVOC_INCEPTIVE_BASELINE: Command = Command { bytes: [0x20, 0xB3], read_len: 3, wait_ms: 10 };
const SET_TVOC_BASELINE: Command = Command { bytes: [0x20, 0x77], read_len: 0, wait_ms: 10 };
const GET_SERIAL_ID: Command = Command { bytes: [0x36, 0x82], read_len: 9, wait_ms: 10 };

// Feature set that reports a TVOC inceptive baseline worth restoring
const FEATURE_SET_TVOC_BASELINE: u16 = 0x0022;

pub struct Sgp30 {
    id: String,
    address: u8,
    bus_id: String,
    crc: Crc8,
}

impl Sgp30 {
    pub fn new(id: String, address: u8, bus_id: String) -> Self {
        Self {
            id,
            address,
            bus_id,
            crc: Crc8::default(),
        }
    }

    /// Issues one command, waits out its processing time, and returns
    /// the checksum-verified reply words.
    async fn command(
        &self,
        bus: &mut I2cBus,
        cmd: &Command,
        payload: &[u16],
    ) -> SensorResult<Vec<u16>> {
        let frame = build_frame(cmd, payload, &self.crc)?;
        bus.write_message(self.address, &frame)?;
        if cmd.read_len == 0 {
            return Ok(Vec::new());
        }

        sleep(Duration::from_millis(cmd.wait_ms)).await;

        let reply = bus.read_message(self.address, cmd.read_len, None)?;
        let data = self.crc.verify(reply.buffer())?;
        Ok(data
            .chunks_exact(2)
            .map(|pair| codec::decode_u16([pair[0], pair[1]], ByteOrder::BigEndian))
            .collect())
    }

    async fn word(&self, bus: &mut I2cBus, cmd: &Command) -> SensorResult<u16> {
        self.command(bus, cmd, &[])
            .await?
            .first()
            .copied()
            .ok_or_else(|| SensorError::Data {
                sensor: self.id.clone(),
                reason: format!("command {:02x?} returned no words", cmd.bytes),
            })
    }
}

/// Frames a command: two command bytes, then the payload words in
/// big-endian order with a checksum byte after each pair.
fn build_frame(cmd: &Command, payload: &[u16], crc: &Crc8) -> SensorResult<Vec<u8>> {
    let mut frame = cmd.bytes.to_vec();
    if !payload.is_empty() {
        let mut data = Vec::with_capacity(payload.len() * 2);
        for &word in payload {
            data.extend_from_slice(&codec::encode_u16(word, ByteOrder::BigEndian));
        }
        frame.extend(crc.apply(&data)?);
    }
    Ok(frame)
}

#[async_trait]
impl SensorDriver for Sgp30 {
    async fn init(&mut self, bus: &mut I2cBus) -> SensorResult<()> {
        self.command(bus, &IAQ_INIT, &[]).await.map_err(|e| {
            SensorError::Init {
                sensor: self.id.clone(),
                reason: format!("iaq_init failed: {e}"),
            }
        })?;

        let serial = self.command(bus, &GET_SERIAL_ID, &[]).await?;
        if let [a, b, c] = serial[..] {
            info!("[{}] serial 0x{:04x}{:04x}{:04x}", self.id, a, b, c);
        }

        // Older feature sets report a TVOC inceptive baseline that must
        // be written back to shorten the warm-up phase.
        let features = self.word(bus, &GET_FEATURE_SET).await?;
        info!("[{}] feature set 0x{:04x}", self.id, features);
        if features == FEATURE_SET_TVOC_BASELINE {
            let baseline = self.word(bus, &GET_TVOC_INCEPTIVE_BASELINE).await?;
            self.command(bus, &SET_TVOC_BASELINE, &[baseline]).await?;
            info!("[{}] restored TVOC baseline 0x{:04x}", self.id, baseline);
        }

        Ok(())
    }

    async fn read(&self, bus: &mut I2cBus) -> SensorResult<SensorDataFrame> {
        let words = self.command(bus, &MEASURE_IAQ, &[]).await?;
        let &[eco2, tvoc] = words.as_slice() else {
            return Err(SensorError::Data {
                sensor: self.id.clone(),
                reason: format!("measure_iaq returned {} words, expected 2", words.len()),
            });
        };

        Ok(SensorDataFrame {
            eco2_ppm: Some(eco2),
            tvoc_ppb: Some(tvoc),
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
