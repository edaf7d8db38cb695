// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::{Decode, Encode};

use crate::{
    helpers::{check_len, read_bytes, read_u16, write_bytes},
    ApduError, ApduStatic, Instruction, HWS_APDU_CLA, MAX_CHUNK_LEN,
};

/// Encode a length-prefixed data field
fn encode_data(data: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
    if data.len() > MAX_CHUNK_LEN {
        return Err(ApduError::InvalidLength);
    }
    check_len(buff, 4 + data.len())?;

    buff[0..2].copy_from_slice(&(data.len() as u16).to_le_bytes());
    buff[2..4].fill(0);

    Ok(4 + write_bytes(buff, 4, data)?)
}

/// Decode a length-prefixed data field
fn decode_data(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
    let n = read_u16(buff, 0)? as usize;
    if n > MAX_CHUNK_LEN {
        return Err(ApduError::InvalidLength);
    }

    let data = read_bytes(buff, 4, n)?;
    Ok((data, 4 + n))
}

/// Payload chunk, sent in response to a
/// [`ChunkRequestResp`][super::ChunkRequestResp]
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |            DATA_LEN           |           RESERVED            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      DATA (DATA_LEN bytes)                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct ChunkAck<'a> {
    pub data: &'a [u8],
}

impl<'a> ChunkAck<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> ApduStatic for ChunkAck<'a> {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::ChunkAck as u8;
}

impl<'a> Encode for ChunkAck<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        encode_data(self.data, buff)
    }
}

impl<'a> Decode<'a> for ChunkAck<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        decode_data(buff).map(|(data, n)| (Self { data }, n))
    }
}

/// Sub-payload piece, sent in response to a
/// [`SubpayloadRequestResp`][super::SubpayloadRequestResp].
///
/// An empty response to the first request indicates the host declines
/// to provide the optional data, encoding matches [ChunkAck].
#[derive(Clone, PartialEq, Debug)]
pub struct SubpayloadAck<'a> {
    pub data: &'a [u8],
}

impl<'a> SubpayloadAck<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> ApduStatic for SubpayloadAck<'a> {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::SubpayloadAck as u8;
}

impl<'a> Encode for SubpayloadAck<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        encode_data(self.data, buff)
    }
}

impl<'a> Decode<'a> for SubpayloadAck<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        decode_data(buff).map(|(data, n)| (Self { data }, n))
    }
}
