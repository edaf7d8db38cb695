// Copyright (c) 2022-2023 The MobileCoin Foundation

//! RLP access helpers for Ethereum payloads, over [`rlp::Rlp`]

pub use rlp::Rlp;
use rlp::DecoderError;

use super::{u256_from_be, u256_to_u64, U256};
use crate::engine::Error;

impl From<DecoderError> for Error {
    fn from(e: DecoderError) -> Self {
        match e {
            DecoderError::RlpIsTooShort | DecoderError::RlpInconsistentLengthAndData => {
                Error::CodecUnderflow
            }
            DecoderError::RlpIsTooBig
            | DecoderError::RlpIncorrectListLen
            | DecoderError::RlpInvalidLength => Error::InvalidLength,
            _ => Error::UnknownVariant,
        }
    }
}

/// Open a list item that must span the whole buffer
pub fn list(buff: &[u8]) -> Result<Rlp, Error> {
    let r = Rlp::new(buff);
    let info = r.payload_info()?;

    if info.total() > buff.len() {
        return Err(Error::CodecUnderflow);
    }
    if info.total() < buff.len() {
        return Err(Error::TrailingData);
    }
    if !r.is_list() {
        return Err(Error::UnknownVariant);
    }

    Ok(r)
}

/// Fetch byte string contents of the list item at `index`
pub fn bytes<'a>(r: &Rlp<'a>, index: usize) -> Result<&'a [u8], Error> {
    Ok(r.at(index)?.data()?)
}

/// Decode the big-endian unsigned integer at `index`
pub fn u256(r: &Rlp, index: usize) -> Result<U256, Error> {
    u256_from_be(bytes(r, index)?).ok_or(Error::InvalidAmount)
}

/// Decode the big-endian u64 at `index`
pub fn u64(r: &Rlp, index: usize) -> Result<u64, Error> {
    u256_to_u64(&u256(r, index)?).ok_or(Error::InvalidAmount)
}
