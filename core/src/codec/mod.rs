// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared decoding primitives for chain payloads

use crate::engine::Error;

pub use primitive_types::U256;

pub mod rlp;

mod varint;
pub use varint::{compact_i32, compact_int, compact_u256};

/// Parse a big-endian unsigned integer, failing where more than 32
/// significant bytes are present
pub fn u256_from_be(b: &[u8]) -> Option<U256> {
    let start = b.iter().position(|v| *v != 0).unwrap_or(b.len());

    match b.len() - start {
        n if n > 32 => None,
        _ => Some(U256::from_big_endian(&b[start..])),
    }
}

/// Narrow to a u64 where the value fits
pub fn u256_to_u64(v: &U256) -> Option<u64> {
    (v.bits() <= 64).then(|| v.low_u64())
}

/// Minimal big-endian byte length of a value
pub fn u256_byte_len(v: &U256) -> usize {
    (v.bits() + 7) / 8
}

/// Cursor over an assembled payload
///
/// Every read checks the remaining length and fails with
/// [`Error::CodecUnderflow`] on over-run.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Current offset into the payload
    pub fn offset(&self) -> usize {
        self.index
    }

    /// Bytes remaining
    pub fn remaining(&self) -> usize {
        self.buff.len() - self.index
    }

    /// Read a slice of `n` bytes
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::CodecUnderflow);
        }

        let b = &self.buff[self.index..][..n];
        self.index += n;

        Ok(b)
    }

    /// Read a fixed size array
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.bytes(N)?);
        Ok(a)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u32_le(&mut self) -> Result<u32, Error> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn u32_be(&mut self) -> Result<u32, Error> {
        self.array().map(u32::from_be_bytes)
    }

    pub fn u64_le(&mut self) -> Result<u64, Error> {
        self.array().map(u64::from_le_bytes)
    }

    pub fn u64_be(&mut self) -> Result<u64, Error> {
        self.array().map(u64::from_be_bytes)
    }

    /// Read a Bitcoin CompactSize integer
    pub fn compact_int(&mut self) -> Result<u64, Error> {
        let (v, n) = compact_int::decode(&self.buff[self.index..])?;
        self.index += n;
        Ok(v)
    }

    /// Read an Alephium signed compact integer
    pub fn compact_i32(&mut self) -> Result<i32, Error> {
        let (v, n) = compact_i32::decode(&self.buff[self.index..])?;
        self.index += n;
        Ok(v)
    }

    /// Read an Alephium unsigned compact integer
    pub fn compact_u256(&mut self) -> Result<U256, Error> {
        let (v, n) = compact_u256::decode(&self.buff[self.index..])?;
        self.index += n;
        Ok(v)
    }

    /// Read a non-negative Alephium compact length / count
    pub fn compact_len(&mut self) -> Result<usize, Error> {
        match self.compact_i32()? {
            v if v < 0 => Err(Error::InvalidLength),
            v => Ok(v as usize),
        }
    }

    /// Read a length-prefixed byte string (Alephium compact length)
    pub fn byte_string(&mut self) -> Result<&'a [u8], Error> {
        let n = self.compact_len()?;
        self.bytes(n)
    }

    /// Consume the reader, failing with [`Error::TrailingData`]
    /// if bytes remain
    pub fn finish(self) -> Result<(), Error> {
        match self.remaining() {
            0 => Ok(()),
            _n => {
                #[cfg(feature = "log")]
                log::warn!("{} trailing bytes at offset {}", _n, self.index);

                Err(Error::TrailingData)
            }
        }
    }
}
