// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Variable length integer encodings
//!
//! - [`compact_int`]: Bitcoin CompactSize, 1/3/5/9 bytes, little-endian body
//! - [`compact_i32`]: Alephium signed compact integer
//! - [`compact_u256`]: Alephium unsigned compact integer
//!
//! The Alephium encodings select their width with the top two bits of the
//! first byte (`0b00` single, `0b01` two, `0b10` four, `0b11` multi-byte),
//! fixed width values are big-endian with the mode bits removed.
//! For multi-byte values the low 6 bits of the header carry `length - 4`.

use heapless::Vec;

use super::{u256_byte_len, u256_from_be, u256_to_u64, U256};
use crate::engine::Error;

const MODE_MASK: u8 = 0xc0;
const BODY_MASK: u8 = 0x3f;

const SINGLE_BYTE: u8 = 0x00;
const TWO_BYTE: u8 = 0x40;
const FOUR_BYTE: u8 = 0x80;
const MULTI_BYTE: u8 = 0xc0;

const SIGN_FLAG: u8 = 0x20;

/// Bitcoin CompactSize integers
pub mod compact_int {
    use super::*;

    /// Encode a value using the minimal CompactSize form
    pub fn encode(v: u64) -> Vec<u8, 9> {
        let mut b = [0u8; 9];

        let n = match v {
            0..=0xfc => {
                b[0] = v as u8;
                1
            }
            0xfd..=0xffff => {
                b[0] = 0xfd;
                b[1..3].copy_from_slice(&(v as u16).to_le_bytes());
                3
            }
            0x10000..=0xffff_ffff => {
                b[0] = 0xfe;
                b[1..5].copy_from_slice(&(v as u32).to_le_bytes());
                5
            }
            _ => {
                b[0] = 0xff;
                b[1..9].copy_from_slice(&v.to_le_bytes());
                9
            }
        };

        Vec::from_slice(&b[..n]).unwrap_or_default()
    }

    /// Encoded length for a given value
    pub const fn encoded_len(v: u64) -> usize {
        match v {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x10000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    /// Decode a CompactSize integer, returning the value and bytes consumed
    pub fn decode(buff: &[u8]) -> Result<(u64, usize), Error> {
        let (prefix, rest) = buff.split_first().ok_or(Error::CodecUnderflow)?;

        let n = match prefix {
            0xfd => 2,
            0xfe => 4,
            0xff => 8,
            v => return Ok((*v as u64, 1)),
        };

        if rest.len() < n {
            return Err(Error::CodecUnderflow);
        }

        let mut b = [0u8; 8];
        b[..n].copy_from_slice(&rest[..n]);

        Ok((u64::from_le_bytes(b), 1 + n))
    }
}

/// Alephium signed compact integers
pub mod compact_i32 {
    use super::*;

    const ONE_BYTE_BOUND: i32 = 0x20;
    const TWO_BYTE_BOUND: i32 = ONE_BYTE_BOUND << 8;
    const FOUR_BYTE_BOUND: i32 = ONE_BYTE_BOUND << 24;

    /// Encode a value using the minimal width
    pub fn encode(v: i32) -> Vec<u8, 5> {
        let b = v.to_be_bytes();
        let mut r = Vec::new();

        let in_range = |bound: i32| (-bound..bound).contains(&v);

        let s: &[u8] = if in_range(ONE_BYTE_BOUND) {
            &[(b[3] & BODY_MASK) | SINGLE_BYTE]
        } else if in_range(TWO_BYTE_BOUND) {
            &[(b[2] & BODY_MASK) | TWO_BYTE, b[3]]
        } else if in_range(FOUR_BYTE_BOUND) {
            &[(b[0] & BODY_MASK) | FOUR_BYTE, b[1], b[2], b[3]]
        } else {
            &[MULTI_BYTE, b[0], b[1], b[2], b[3]]
        };

        // Infallible, at most five bytes
        let _ = r.extend_from_slice(s);

        r
    }

    /// Decode a signed compact integer, returning the value and bytes consumed
    pub fn decode(buff: &[u8]) -> Result<(i32, usize), Error> {
        let header = *buff.first().ok_or(Error::CodecUnderflow)?;

        let n = match header & MODE_MASK {
            SINGLE_BYTE => 1,
            TWO_BYTE => 2,
            FOUR_BYTE => 4,
            _ => {
                // Multi-byte form must carry exactly four bytes for i32
                if header & BODY_MASK != 0 {
                    return Err(Error::UnknownVariant);
                }
                if buff.len() < 5 {
                    return Err(Error::CodecUnderflow);
                }

                let mut b = [0u8; 4];
                b.copy_from_slice(&buff[1..5]);
                return Ok((i32::from_be_bytes(b), 5));
            }
        };

        if buff.len() < n {
            return Err(Error::CodecUnderflow);
        }

        // Sign-extend the 6-bit header body
        let init = match header & SIGN_FLAG != 0 {
            true => (header as i32) | !(BODY_MASK as i32),
            false => (header & BODY_MASK) as i32,
        };

        let v = buff[1..n]
            .iter()
            .fold(init, |acc, b| (acc << 8) | *b as i32);

        Ok((v, n))
    }
}

/// Alephium unsigned compact integers
pub mod compact_u256 {
    use super::*;

    const ONE_BYTE_BOUND: u64 = 0x40;
    const TWO_BYTE_BOUND: u64 = ONE_BYTE_BOUND << 8;
    const FOUR_BYTE_BOUND: u64 = ONE_BYTE_BOUND << 24;

    /// Encode a value using the minimal width
    pub fn encode(v: &U256) -> Vec<u8, 33> {
        let mut r = Vec::new();

        match u256_to_u64(v) {
            Some(n) if n < ONE_BYTE_BOUND => {
                let _ = r.push(n as u8 | SINGLE_BYTE);
            }
            Some(n) if n < TWO_BYTE_BOUND => {
                let b = (n as u16).to_be_bytes();
                let _ = r.extend_from_slice(&[b[0] | TWO_BYTE, b[1]]);
            }
            Some(n) if n < FOUR_BYTE_BOUND => {
                let b = (n as u32).to_be_bytes();
                let _ = r.extend_from_slice(&[b[0] | FOUR_BYTE, b[1], b[2], b[3]]);
            }
            _ => {
                // Values past the four byte bound always need at least 4 bytes
                let len = u256_byte_len(v).max(4);
                let mut b = [0u8; 32];
                v.to_big_endian(&mut b);

                let _ = r.push(MULTI_BYTE | (len - 4) as u8);
                let _ = r.extend_from_slice(&b[32 - len..]);
            }
        }

        r
    }

    /// Decode an unsigned compact integer, returning the value and bytes consumed
    pub fn decode(buff: &[u8]) -> Result<(U256, usize), Error> {
        let header = *buff.first().ok_or(Error::CodecUnderflow)?;

        let (n, body) = match header & MODE_MASK {
            SINGLE_BYTE => (1, &buff[1..1]),
            TWO_BYTE => (2, buff.get(1..2).ok_or(Error::CodecUnderflow)?),
            FOUR_BYTE => (4, buff.get(1..4).ok_or(Error::CodecUnderflow)?),
            _ => {
                let len = (header & BODY_MASK) as usize + 4;
                if len > 32 {
                    return Err(Error::InvalidAmount);
                }

                let b = buff.get(1..1 + len).ok_or(Error::CodecUnderflow)?;
                let v = u256_from_be(b).ok_or(Error::InvalidAmount)?;

                return Ok((v, 1 + len));
            }
        };

        let v = body
            .iter()
            .fold((header & BODY_MASK) as u64, |acc, b| (acc << 8) | *b as u64);

        Ok((U256::from(v), n))
    }
}
