//! SMBus-level access: quick presence probes and register-less byte
//! reads, plus the byte-data register accessors.
//!
//! Everything here funnels through [`ffi::smbus_access`]; the `size`
//! code discriminates quick vs byte semantics for the kernel.

use crate::bus::ffi::{self, SmbusData};
use crate::errors::{I2cError, I2cResult};
use crate::bus::i2c::I2cBus;

impl I2cBus {
    fn smbus_access(
        &mut self,
        read_write: u8,
        command: u8,
        size: u32,
        data: &SmbusData,
    ) -> I2cResult<SmbusData> {
        let address = self.follower()?;
        ffi::smbus_access(self.raw_fd(), read_write, command, size, data)
            .map_err(|errno| I2cError::from_errno(address, errno))
    }

    /// Zero-length quick transaction carrying only the read/write bit.
    ///
    /// Touches no register; the follower's ACK is the whole result,
    /// which makes this the cheapest liveness probe.
    pub fn write_quick(&mut self, bit: bool) -> I2cResult<()> {
        let read_write = if bit {
            ffi::I2C_SMBUS_READ
        } else {
            ffi::I2C_SMBUS_WRITE
        };
        self.smbus_access(read_write, 0, ffi::I2C_SMBUS_QUICK, &SmbusData::Quick)
            .map(drop)
    }

    /// Reads one byte with no register argument.
    ///
    /// The probe of choice for address ranges where a quick write could
    /// corrupt follower state.
    pub fn read_byte(&mut self) -> I2cResult<u8> {
        match self.smbus_access(
            ffi::I2C_SMBUS_READ,
            0,
            ffi::I2C_SMBUS_BYTE,
            &SmbusData::Byte(0),
        )? {
            SmbusData::Byte(value) => Ok(value),
            other => Err(I2cError::InvalidArgument {
                reason: format!("byte read returned {other:?}"),
            }),
        }
    }

    /// Reads one byte from register `command`.
    pub fn read_byte_data(&mut self, command: u8) -> I2cResult<u8> {
        match self.smbus_access(
            ffi::I2C_SMBUS_READ,
            command,
            ffi::I2C_SMBUS_BYTE_DATA,
            &SmbusData::Byte(0),
        )? {
            SmbusData::Byte(value) => Ok(value),
            other => Err(I2cError::InvalidArgument {
                reason: format!("byte read returned {other:?}"),
            }),
        }
    }

    /// Writes one byte to register `command`.
    pub fn write_byte_data(&mut self, command: u8, value: u8) -> I2cResult<()> {
        self.smbus_access(
            ffi::I2C_SMBUS_WRITE,
            command,
            ffi::I2C_SMBUS_BYTE_DATA,
            &SmbusData::Byte(value),
        )
        .map(drop)
    }
}
