#![allow(unused)]
// Copyright (c) 2022-2023 The MobileCoin Foundation

use crate::{ApduError, ChainTag};

/// encdec helper module for fixed size arrays
pub(crate) mod arr {
    use encdec::Error;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < d.len() {
            return Err(Error::Length);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, Error> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), Error> {
        if buff.len() < N {
            return Err(Error::Length);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Write a 32-bit aligned header, checking the buffer can hold `total` bytes
pub(crate) fn check_len(buff: &[u8], total: usize) -> Result<(), ApduError> {
    match buff.len() < total {
        true => Err(ApduError::InvalidLength),
        false => Ok(()),
    }
}

/// Copy a variable length field into the buffer at the provided index
pub(crate) fn write_bytes(buff: &mut [u8], index: usize, d: &[u8]) -> Result<usize, ApduError> {
    if buff.len() < index + d.len() {
        return Err(ApduError::InvalidLength);
    }
    buff[index..][..d.len()].copy_from_slice(d);
    Ok(d.len())
}

/// Borrow a variable length field from the buffer at the provided index
pub(crate) fn read_bytes(buff: &[u8], index: usize, len: usize) -> Result<&[u8], ApduError> {
    if buff.len() < index + len {
        return Err(ApduError::InvalidLength);
    }
    Ok(&buff[index..][..len])
}

/// Borrow a UTF-8 string from the buffer at the provided index
pub(crate) fn read_str(buff: &[u8], index: usize, len: usize) -> Result<&str, ApduError> {
    let d = read_bytes(buff, index, len)?;
    core::str::from_utf8(d).map_err(|_| ApduError::InvalidUtf8)
}

/// Read a little-endian u16 at the provided index
pub(crate) fn read_u16(buff: &[u8], index: usize) -> Result<u16, ApduError> {
    let d = read_bytes(buff, index, 2)?;
    Ok(u16::from_le_bytes([d[0], d[1]]))
}

/// Read a little-endian u32 at the provided index
pub(crate) fn read_u32(buff: &[u8], index: usize) -> Result<u32, ApduError> {
    let d = read_bytes(buff, index, 4)?;
    Ok(u32::from_le_bytes([d[0], d[1], d[2], d[3]]))
}

/// Read a little-endian u64 at the provided index
pub(crate) fn read_u64(buff: &[u8], index: usize) -> Result<u64, ApduError> {
    let d = read_bytes(buff, index, 8)?;
    let mut b = [0u8; 8];
    b.copy_from_slice(d);
    Ok(u64::from_le_bytes(b))
}

/// Decode a [ChainTag] byte
pub(crate) fn read_chain(buff: &[u8], index: usize) -> Result<ChainTag, ApduError> {
    let d = read_bytes(buff, index, 1)?;
    ChainTag::try_from(d[0]).map_err(|_| ApduError::InvalidEncoding)
}
