use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use super::{SensorDataFrame, SensorDriver};
use crate::bus::i2c::I2cBus;
use crate::codec::{self, ByteOrder};
use crate::errors::{I2cError, SensorError, SensorResult};

// Switches the sensor from its default UART mode to I2C
const SELECT_I2C: u8 = 0x88;

// Full reply frame: 2 reserved bytes, 13 big-endian words, 1 checksum
const DATA_FRAME_SIZE: usize = 29;

// Byte offsets of the concentration and particle-count words
const PM_STANDARD_OFFSET: usize = 4;
const PM_ATMOSPHERIC_OFFSET: usize = 10;
const PARTICLE_COUNT_OFFSET: usize = 16;

pub struct Hm3301 {
    id: String,
    address: u8,
    bus_id: String,
}

impl Hm3301 {
    pub fn new(id: String, address: u8, bus_id: String) -> Self {
        Self { id, address, bus_id }
    }
}

struct ParticulateFrame {
    standard: [u16; 3],
    atmospheric: [u16; 3],
    particle_counts: [u16; 6],
}

/// Validates the additive frame checksum and extracts the concentration
/// and particle-count words.
fn parse_frame(frame: &[u8]) -> Result<ParticulateFrame, I2cError> {
    if frame.len() != DATA_FRAME_SIZE {
        return Err(I2cError::InvalidArgument {
            reason: format!(
                "particulate frame is {} bytes, expected {DATA_FRAME_SIZE}",
                frame.len()
            ),
        });
    }

    // The last byte is the 8-bit sum of everything before it.
    let sum = frame[..DATA_FRAME_SIZE - 1]
        .iter()
        .fold(0u8, |acc, &byte| acc.wrapping_add(byte));
    if sum != frame[DATA_FRAME_SIZE - 1] {
        return Err(I2cError::InvalidCrc {
            expected: sum,
            actual: frame[DATA_FRAME_SIZE - 1],
        });
    }

    let word = |offset: usize| codec::decode_u16([frame[offset], frame[offset + 1]], ByteOrder::BigEndian);
    let standard = [
        word(PM_STANDARD_OFFSET),
        word(PM_STANDARD_OFFSET + 2),
        word(PM_STANDARD_OFFSET + 4),
    ];
    let atmospheric = [
        word(PM_ATMOSPHERIC_OFFSET),
        word(PM_ATMOSPHERIC_OFFSET + 2),
        word(PM_ATMOSPHERIC_OFFSET + 4),
    ];
    let particle_counts = [
        word(PARTICLE_COUNT_OFFSET),
        word(PARTICLE_COUNT_OFFSET + 2),
        word(PARTICLE_COUNT_OFFSET + 4),
        word(PARTICLE_COUNT_OFFSET + 6),
        word(PARTICLE_COUNT_OFFSET + 8),
        word(PARTICLE_COUNT_OFFSET + 10),
    ];
    Ok(ParticulateFrame {
        standard,
        atmospheric,
        particle_counts,
    })
}

#[async_trait]
impl SensorDriver for Hm3301 {
    async fn init(&mut self, bus: &mut I2cBus) -> SensorResult<()> {
        bus.write_message(self.address, &[SELECT_I2C])
            .map_err(|e| SensorError::Init {
                sensor: self.id.clone(),
                reason: format!("I2C mode select failed: {e}"),
            })?;
        // First frame needs a moment after the mode switch
        sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    async fn read(&self, bus: &mut I2cBus) -> SensorResult<SensorDataFrame> {
        let reply = bus.read_message(self.address, DATA_FRAME_SIZE, None)?;
        let parsed = parse_frame(reply.buffer())?;

        Ok(SensorDataFrame {
            pm_standard: Some(parsed.standard),
            pm_atmospheric: Some(parsed.atmospheric),
            particle_counts: Some(parsed.particle_counts),
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

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(standard: [u16; 3], atmospheric: [u16; 3], counts: [u16; 6]) -> Vec<u8> {
        let mut frame = vec![0u8; DATA_FRAME_SIZE];
        let mut put = |offset: usize, values: &[u16]| {
            for (i, &value) in values.iter().enumerate() {
                let bytes = codec::encode_u16(value, ByteOrder::BigEndian);
                frame[offset + i * 2..offset + i * 2 + 2].copy_from_slice(&bytes);
            }
        };
        put(PM_STANDARD_OFFSET, &standard);
        put(PM_ATMOSPHERIC_OFFSET, &atmospheric);
        put(PARTICLE_COUNT_OFFSET, &counts);
        frame[DATA_FRAME_SIZE - 1] = frame[..DATA_FRAME_SIZE - 1]
            .iter()
            .fold(0u8, |acc, &byte| acc.wrapping_add(byte));
        frame
    }

    #[test]
    fn parses_all_words_from_a_valid_frame() {
        let frame = frame_with([3, 5, 8], [4, 6, 9], [120, 80, 40, 10, 2, 1]);
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.standard, [3, 5, 8]);
        assert_eq!(parsed.atmospheric, [4, 6, 9]);
        assert_eq!(parsed.particle_counts, [120, 80, 40, 10, 2, 1]);
    }

    #[test]
    fn corrupted_frames_fail_the_checksum() {
        let mut frame = frame_with([3, 5, 8], [4, 6, 9], [120, 80, 40, 10, 2, 1]);
        frame[PM_STANDARD_OFFSET] ^= 0x01;
        assert!(matches!(
            parse_frame(&frame),
            Err(I2cError::InvalidCrc { .. })
        ));
    }

    #[test]
    fn truncated_frames_are_invalid() {
        let frame = frame_with([3, 5, 8], [4, 6, 9], [120, 80, 40, 10, 2, 1]);
        assert!(matches!(
            parse_frame(&frame[..28]),
            Err(I2cError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn words_are_big_endian_on_the_wire() {
        let frame = frame_with([0x0102, 0, 0], [0, 0, 0], [0x0304, 0, 0, 0, 0, 0]);
        assert_eq!(frame[PM_STANDARD_OFFSET], 0x01);
        assert_eq!(frame[PM_STANDARD_OFFSET + 1], 0x02);
        assert_eq!(frame[PARTICLE_COUNT_OFFSET], 0x03);
        assert_eq!(frame[PARTICLE_COUNT_OFFSET + 1], 0x04);
    }
}
