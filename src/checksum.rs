//! CRC-8 validation of multi-byte sensor replies.
//!
//! Sensirion-style framing: every 16-bit word on the wire is followed by
//! one checksum byte, computed MSB-first over the two data bytes.

use crate::errors::{I2cError, I2cResult};

/// 8-bit CRC with a fixed polynomial and initial accumulator.
///
/// The defaults (polynomial 0x31, init 0xFF) match the SGP30 protocol.
/// Parameters are set once per sensor protocol and never change at
/// runtime.
#[derive(Debug, Clone, Copy)]
pub struct Crc8 {
    poly: u8,
    init: u8,
}

impl Default for Crc8 {
    fn default() -> Self {
        Self {
            poly: 0x31,
            init: 0xFF,
        }
    }
}

impl Crc8 {
    pub fn new(poly: u8, init: u8) -> Self {
        Self { poly, init }
    }

    /// Checksum over a byte run (the wire protocol feeds it data pairs).
    pub fn compute(&self, data: &[u8]) -> u8 {
        let mut crc = self.init;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ self.poly
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    /// Checks each (data, data, checksum) triplet of `payload` and returns
    /// the data bytes with the checksum bytes stripped.
    ///
    /// The first mismatch aborts the whole payload; no partially verified
    /// data is ever returned.
    pub fn verify(&self, payload: &[u8]) -> I2cResult<Vec<u8>> {
        if payload.len() % 3 != 0 {
            return Err(I2cError::InvalidArgument {
                reason: format!(
                    "checksummed payload length {} is not a multiple of 3",
                    payload.len()
                ),
            });
        }

        let mut data = Vec::with_capacity(payload.len() / 3 * 2);
        for group in payload.chunks_exact(3) {
            let expected = self.compute(&group[..2]);
            if expected != group[2] {
                return Err(I2cError::InvalidCrc {
                    expected,
                    actual: group[2],
                });
            }
            data.extend_from_slice(&group[..2]);
        }
        Ok(data)
    }

    /// Inverse of [`verify`](Self::verify): interleaves a checksum byte
    /// after every data pair of an even-length payload.
    pub fn apply(&self, data: &[u8]) -> I2cResult<Vec<u8>> {
        if data.len() % 2 != 0 {
            return Err(I2cError::InvalidArgument {
                reason: format!("payload length {} is odd, cannot checksum pairs", data.len()),
            });
        }

        let mut out = Vec::with_capacity(data.len() / 2 * 3);
        for pair in data.chunks_exact(2) {
            out.extend_from_slice(pair);
            out.push(self.compute(pair));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Regression fixture: the SGP30 datasheet's 0xBEEF example.
    #[test]
    fn compute_matches_sensor_protocol() {
        let crc = Crc8::default();
        assert_eq!(crc.compute(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn verify_accepts_computed_checksums() {
        let crc = Crc8::default();
        let data = crc.verify(&[0xBE, 0xEF, 0x92]).unwrap();
        assert_eq!(data, vec![0xBE, 0xEF]);
    }

    #[test]
    fn verify_rejects_any_single_bit_flip() {
        let crc = Crc8::default();
        let good = [0xBE, 0xEF, 0x92];
        for byte in 0..3 {
            for bit in 0..8 {
                let mut corrupted = good;
                corrupted[byte] ^= 1 << bit;
                assert!(
                    crc.verify(&corrupted).is_err(),
                    "flipping bit {bit} of byte {byte} must fail verification"
                );
            }
        }
    }

    #[test]
    fn verify_reports_mismatch_as_invalid_crc() {
        let crc = Crc8::default();
        match crc.verify(&[0xBE, 0xEF, 0x00]) {
            Err(I2cError::InvalidCrc {
                expected: 0x92,
                actual: 0x00,
            }) => {}
            other => panic!("expected InvalidCrc, got {other:?}"),
        }
    }

    #[test]
    fn verify_rejects_ragged_payloads() {
        let crc = Crc8::default();
        assert!(matches!(
            crc.verify(&[0xBE, 0xEF]),
            Err(I2cError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn apply_then_verify_round_trips() {
        let crc = Crc8::default();
        let payloads: [&[u8]; 4] = [
            &[],
            &[0xBE, 0xEF],
            &[0x01, 0x02, 0x03, 0x04],
            &[0x00, 0x00, 0xFF, 0xFF, 0x12, 0x34, 0xAB, 0xCD],
        ];
        for payload in payloads {
            let framed = crc.apply(payload).unwrap();
            assert_eq!(framed.len(), payload.len() / 2 * 3);
            assert_eq!(crc.verify(&framed).unwrap(), payload);
        }
    }

    #[test]
    fn apply_rejects_odd_length() {
        let crc = Crc8::default();
        assert!(matches!(
            crc.apply(&[0x01, 0x02, 0x03]),
            Err(I2cError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn custom_parameters_change_the_checksum() {
        let sensirion = Crc8::default();
        let other = Crc8::new(0x07, 0x00);
        assert_ne!(
            sensirion.compute(&[0xBE, 0xEF]),
            other.compute(&[0xBE, 0xEF])
        );
    }
}
