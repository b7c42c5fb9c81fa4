//! Bus handle and raw stream transport.
//!
//! An [`I2cBus`] owns the open character device for one physical bus.
//! Every operation blocks the calling thread until the kernel call
//! returns; sharing a handle across tasks needs external serialization
//! (the registry wraps each one in `Arc<Mutex<_>>`).

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;

use crate::bus::{check_address, ffi};
use crate::codec::{self, ByteOrder};
use crate::errors::{I2cError, I2cResult};

/// One open connection to a `/dev/i2c-*` device.
///
/// The file descriptor is owned by the handle and closed on drop, on
/// every exit path. A follower address set with
/// [`set_follower`](Self::set_follower) sticks until it is re-issued;
/// message transactions carry their own address and ignore it.
pub struct I2cBus {
    file: File,
    path: String,
    address: Option<u8>,
}

impl I2cBus {
    /// Opens bus number `bus` (`/dev/i2c-<bus>`) for read/write.
    pub fn open(bus: u32) -> I2cResult<Self> {
        Self::open_path(format!("/dev/i2c-{bus}"))
    }

    /// Opens a bus by explicit device path.
    pub fn open_path(path: impl Into<String>) -> I2cResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| I2cError::NoSuchBus {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            file,
            path,
            address: None,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn raw_fd(&self) -> i32 {
        self.file.as_raw_fd()
    }

    /// Binds subsequent stream and SMBus operations to a 7-bit follower
    /// address.
    pub fn set_follower(&mut self, address: u8) -> I2cResult<()> {
        check_address(address)?;
        ffi::set_follower(self.raw_fd(), address)
            .map_err(|errno| I2cError::from_errno(address, errno))?;
        self.address = Some(address);
        Ok(())
    }

    /// The follower address stream and SMBus operations are bound to.
    pub fn follower(&self) -> I2cResult<u8> {
        self.address.ok_or_else(|| I2cError::InvalidArgument {
            reason: "no follower address bound, call set_follower first".to_string(),
        })
    }

    /// Writes `bytes` verbatim to the bound follower. No framing beyond
    /// the raw bytes.
    pub fn write(&mut self, bytes: &[u8]) -> I2cResult<()> {
        let address = self.follower()?;
        let written = self
            .file
            .write(bytes)
            .map_err(|err| I2cError::from_io(address, err))?;
        if written != bytes.len() {
            return Err(I2cError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!(
                    "short write to 0x{address:02x}: {written} of {} bytes",
                    bytes.len()
                ),
            )));
        }
        Ok(())
    }

    /// Reads exactly `length` bytes from the bound follower.
    ///
    /// With a register, one address byte is written unframed first. With
    /// `None` only the read is issued, for devices that latched the
    /// register in an earlier write. One read syscall; a short read is a
    /// failure, never retried here.
    pub fn read(&mut self, register: Option<u8>, length: usize) -> I2cResult<Vec<u8>> {
        let address = self.follower()?;
        if let Some(register) = register {
            self.write(&[register])?;
        }
        let mut buf = vec![0u8; length];
        let got = self
            .file
            .read(&mut buf)
            .map_err(|err| I2cError::from_io(address, err))?;
        if got != length {
            return Err(I2cError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read from 0x{address:02x}: {got} of {length} bytes"),
            )));
        }
        Ok(buf)
    }

    pub fn read_u8(&mut self, register: u8) -> I2cResult<u8> {
        let raw = self.read(Some(register), 1)?;
        Ok(codec::decode_u8(raw[0]))
    }

    pub fn read_i8(&mut self, register: u8) -> I2cResult<i8> {
        let raw = self.read(Some(register), 1)?;
        Ok(codec::decode_i8(raw[0]))
    }

    pub fn read_u16(&mut self, register: u8, order: ByteOrder) -> I2cResult<u16> {
        let raw = self.read(Some(register), 2)?;
        Ok(codec::decode_u16([raw[0], raw[1]], order))
    }

    pub fn read_i16(&mut self, register: u8, order: ByteOrder) -> I2cResult<i16> {
        let raw = self.read(Some(register), 2)?;
        Ok(codec::decode_i16([raw[0], raw[1]], order))
    }
}

impl std::fmt::Debug for I2cBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cBus")
            .field("path", &self.path)
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bus_path_is_no_such_bus() {
        match I2cBus::open_path("/dev/i2c-no-such-bus") {
            Err(I2cError::NoSuchBus { path, .. }) => {
                assert_eq!(path, "/dev/i2c-no-such-bus");
            }
            other => panic!("expected NoSuchBus, got {other:?}"),
        }
    }

    #[test]
    fn open_builds_the_conventional_device_path() {
        // Bus 200 is not going to exist anywhere; the error must still
        // name the path that was tried.
        match I2cBus::open(200) {
            Err(I2cError::NoSuchBus { path, .. }) => assert_eq!(path, "/dev/i2c-200"),
            other => panic!("expected NoSuchBus, got {other:?}"),
        }
    }
}
