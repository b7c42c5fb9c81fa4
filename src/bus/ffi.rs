//! Kernel interface of the /dev/i2c-* character devices.
//!
//! Constants and descriptor layouts mirror <linux/i2c.h> and
//! <linux/i2c-dev.h>. This module is the single marshaling boundary:
//! raw pointers into message buffers and the SMBus data union never
//! leave it, and every kernel call above goes through one of the safe
//! wrappers below.

#![allow(non_camel_case_types)]

use std::os::unix::io::RawFd;

use libc::c_int;
use nix::errno::Errno;
use nix::{ioctl_write_int_bad, ioctl_write_ptr_bad};

// Addressing
pub const I2C_FOLLOWER: u16 = 0x0703;

// Combined transactions
pub const I2C_RDWR: u16 = 0x0707;
pub const I2C_M_RD: u16 = 0x0001;
pub const I2C_RDWR_IOCTL_MAX_MSGS: usize = 42;

// SMBus transfers
pub const I2C_SMBUS: u16 = 0x0720;
pub const I2C_SMBUS_READ: u8 = 1;
pub const I2C_SMBUS_WRITE: u8 = 0;
pub const I2C_SMBUS_QUICK: u32 = 0;
pub const I2C_SMBUS_BYTE: u32 = 1;
pub const I2C_SMBUS_BYTE_DATA: u32 = 2;
pub const I2C_SMBUS_WORD_DATA: u32 = 3;
pub const I2C_SMBUS_BLOCK_DATA: u32 = 5;
pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

/// One message descriptor of a combined transaction, exactly as the
/// kernel expects it: address, direction flags, byte length, buffer.
#[repr(C)]
pub struct i2c_msg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
pub struct i2c_rdwr_ioctl_data {
    msgs: *mut i2c_msg,
    nmsgs: u32,
}

/// The kernel's SMBus payload block: one byte, one word, or a block of
/// up to [`I2C_SMBUS_BLOCK_MAX`] bytes preceded by a length byte.
#[repr(C)]
#[derive(Clone, Copy)]
pub union i2c_smbus_data {
    byte: u8,
    word: u16,
    block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

impl std::fmt::Debug for i2c_smbus_data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("i2c_smbus_data").finish_non_exhaustive()
    }
}

#[repr(C)]
pub struct i2c_smbus_ioctl_data {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut i2c_smbus_data,
}

/// Tagged rendition of the SMBus data union. The active shape is
/// selected by the `size` code of the transfer that carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmbusData {
    /// Quick transfers carry no payload at all.
    Quick,
    Byte(u8),
    Word(u16),
    Block(Vec<u8>),
}

ioctl_write_int_bad!(ioctl_set_follower, I2C_FOLLOWER);
ioctl_write_ptr_bad!(ioctl_rdwr, I2C_RDWR, i2c_rdwr_ioctl_data);
ioctl_write_ptr_bad!(ioctl_smbus, I2C_SMBUS, i2c_smbus_ioctl_data);

/// Binds subsequent stream and SMBus operations on `fd` to `address`.
pub fn set_follower(fd: RawFd, address: u8) -> Result<(), Errno> {
    unsafe { ioctl_set_follower(fd, address as c_int) }.map(drop)
}

/// Builds a kernel message descriptor over a caller-owned buffer.
///
/// The descriptor's `len` is always the buffer's actual length, so the
/// kernel can never write past the allocation. The buffer must outlive
/// the [`rdwr`] call the descriptor is submitted to.
pub fn make_msg(address: u8, read: bool, buf: &mut [u8]) -> i2c_msg {
    debug_assert!(buf.len() <= u16::MAX as usize);
    i2c_msg {
        addr: address as u16,
        flags: if read { I2C_M_RD } else { 0 },
        len: buf.len() as u16,
        buf: buf.as_mut_ptr(),
    }
}

/// Submits `msgs` as one atomic combined transaction.
pub fn rdwr(fd: RawFd, msgs: &mut [i2c_msg]) -> Result<(), Errno> {
    let data = i2c_rdwr_ioctl_data {
        msgs: msgs.as_mut_ptr(),
        nmsgs: msgs.len() as u32,
    };
    unsafe { ioctl_rdwr(fd, &data) }.map(drop)
}

/// The one primitive every SMBus-level operation funnels through.
///
/// `size` selects the union shape the kernel reads (writes) or fills
/// (reads); the reply is unmarshaled back into the matching tagged
/// variant.
pub fn smbus_access(
    fd: RawFd,
    read_write: u8,
    command: u8,
    size: u32,
    data: &SmbusData,
) -> Result<SmbusData, Errno> {
    let mut raw = marshal_smbus_data(data)?;
    let ioctl_data = i2c_smbus_ioctl_data {
        read_write,
        command,
        size,
        data: &mut raw,
    };
    unsafe { ioctl_smbus(fd, &ioctl_data) }?;
    Ok(unmarshal_smbus_data(&raw, size))
}

fn marshal_smbus_data(data: &SmbusData) -> Result<i2c_smbus_data, Errno> {
    // Starting from the zeroed largest member initializes every shape.
    let mut raw = i2c_smbus_data {
        block: [0; I2C_SMBUS_BLOCK_MAX + 2],
    };
    match data {
        SmbusData::Quick => {}
        SmbusData::Byte(byte) => raw.byte = *byte,
        SmbusData::Word(word) => raw.word = *word,
        SmbusData::Block(bytes) => {
            if bytes.len() > I2C_SMBUS_BLOCK_MAX {
                return Err(Errno::EINVAL);
            }
            unsafe {
                raw.block[0] = bytes.len() as u8;
                raw.block[1..=bytes.len()].copy_from_slice(bytes);
            }
        }
    }
    Ok(raw)
}

fn unmarshal_smbus_data(raw: &i2c_smbus_data, size: u32) -> SmbusData {
    match size {
        I2C_SMBUS_BYTE | I2C_SMBUS_BYTE_DATA => SmbusData::Byte(unsafe { raw.byte }),
        I2C_SMBUS_WORD_DATA => SmbusData::Word(unsafe { raw.word }),
        I2C_SMBUS_BLOCK_DATA => {
            let block = unsafe { &raw.block };
            let len = (block[0] as usize).min(I2C_SMBUS_BLOCK_MAX);
            SmbusData::Block(block[1..=len].to_vec())
        }
        // Quick and anything unknown carry no payload
        _ => SmbusData::Quick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_length_tracks_the_buffer() {
        let mut buf = vec![0u8; 6];
        let msg = make_msg(0x58, true, &mut buf);
        assert_eq!(msg.addr, 0x58);
        assert_eq!(msg.flags, I2C_M_RD);
        assert_eq!(msg.len, 6);
        assert_eq!(msg.buf, buf.as_mut_ptr());
    }

    #[test]
    fn write_msgs_carry_no_read_flag() {
        let mut buf = vec![0x20u8, 0x08];
        let msg = make_msg(0x58, false, &mut buf);
        assert_eq!(msg.flags, 0);
        assert_eq!(msg.len, 2);
    }

    #[test]
    fn smbus_byte_round_trips_through_the_union() {
        let raw = marshal_smbus_data(&SmbusData::Byte(0xA5)).unwrap();
        assert_eq!(
            unmarshal_smbus_data(&raw, I2C_SMBUS_BYTE),
            SmbusData::Byte(0xA5)
        );
    }

    #[test]
    fn smbus_word_round_trips_through_the_union() {
        let raw = marshal_smbus_data(&SmbusData::Word(0xBEEF)).unwrap();
        assert_eq!(
            unmarshal_smbus_data(&raw, I2C_SMBUS_WORD_DATA),
            SmbusData::Word(0xBEEF)
        );
    }

    #[test]
    fn smbus_block_round_trips_with_length_prefix() {
        let bytes = vec![1u8, 2, 3, 4, 5];
        let raw = marshal_smbus_data(&SmbusData::Block(bytes.clone())).unwrap();
        assert_eq!(
            unmarshal_smbus_data(&raw, I2C_SMBUS_BLOCK_DATA),
            SmbusData::Block(bytes)
        );
    }

    #[test]
    fn oversized_blocks_are_rejected_before_the_kernel_sees_them() {
        let too_big = vec![0u8; I2C_SMBUS_BLOCK_MAX + 1];
        assert_eq!(
            marshal_smbus_data(&SmbusData::Block(too_big)).unwrap_err(),
            Errno::EINVAL
        );
    }

    #[test]
    fn descriptor_layouts_match_the_kernel_abi() {
        use std::mem::{align_of, offset_of, size_of};

        assert_eq!(offset_of!(i2c_msg, addr), 0);
        assert_eq!(offset_of!(i2c_msg, flags), 2);
        assert_eq!(offset_of!(i2c_msg, len), 4);
        assert_eq!(
            size_of::<i2c_msg>(),
            offset_of!(i2c_msg, buf) + size_of::<*mut u8>()
        );
        assert_eq!(size_of::<i2c_smbus_data>(), I2C_SMBUS_BLOCK_MAX + 2);
        assert_eq!(align_of::<i2c_smbus_data>(), align_of::<u16>());
    }
}
