// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction related APDUs, used to sign a transaction via the hardware wallet.
//!
//! A signing operation starts with [SignTxInit], the device then responds with
//! either a [SignedResp] or a request for more data ([ChunkRequestResp] /
//! [SubpayloadRequestResp]) which the host answers with [ChunkAck] / [SubpayloadAck].
//!
//! See [hwsign_core::engine] for interaction and state machines

use encdec::{Decode, Encode};
use heapless::Vec;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::{
    check_kind,
    helpers::{check_len, read_bytes, read_str, read_u16, read_u32, write_bytes},
    ApduError, ApduResponse, ResponseKind, MAX_SIGNATURES,
};

mod tx_init;
pub use tx_init::*;

mod chunk;
pub use chunk::*;

/// Request for the next payload chunk, answered with [ChunkAck]
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0x83)  |                    RESERVED                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            LENGTH                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ChunkRequestResp {
    /// Exact length of the chunk to be sent
    pub length: u32,
}

impl ApduResponse for ChunkRequestResp {
    const KIND: ResponseKind = ResponseKind::ChunkRequest;
}

impl Encode for ChunkRequestResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(8)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, 8)?;

        buff[0] = Self::KIND as u8;
        buff[1..4].fill(0);
        buff[4..8].copy_from_slice(&self.length.to_le_bytes());

        Ok(8)
    }
}

impl<'a> Decode<'a> for ChunkRequestResp {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        let length = read_u32(buff, 4)?;
        Ok((Self { length }, 8))
    }
}

/// Kinds of sub-payload the device may request following assembly
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum SubpayloadKind {
    /// Inline contract bytecode
    ContractBytecode = 0x01,
    /// Transaction script
    Script = 0x02,
}

/// Request for a piece of a sub-payload window, answered with [SubpayloadAck]
///
/// Windows are streamed in pieces of at most [MAX_CHUNK_LEN][crate::MAX_CHUNK_LEN]
/// bytes, `OFFSET` is relative to the start of the window.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0x84)  |   SUB_KIND    |           RESERVED            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             TOTAL                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            OFFSET                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            LENGTH                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SubpayloadRequestResp {
    /// Sub-payload kind
    pub kind: SubpayloadKind,
    /// Total sub-payload length
    pub total: u32,
    /// Offset of the requested piece
    pub offset: u32,
    /// Requested piece length
    pub length: u32,
}

impl ApduResponse for SubpayloadRequestResp {
    const KIND: ResponseKind = ResponseKind::SubpayloadRequest;
}

impl Encode for SubpayloadRequestResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(16)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, 16)?;

        buff[0] = Self::KIND as u8;
        buff[1] = self.kind as u8;
        buff[2..4].fill(0);
        buff[4..8].copy_from_slice(&self.total.to_le_bytes());
        buff[8..12].copy_from_slice(&self.offset.to_le_bytes());
        buff[12..16].copy_from_slice(&self.length.to_le_bytes());

        Ok(16)
    }
}

impl<'a> Decode<'a> for SubpayloadRequestResp {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        check_len(buff, 16)?;

        let kind = SubpayloadKind::try_from(buff[1]).map_err(|_| ApduError::InvalidEncoding)?;

        Ok((
            Self {
                kind,
                total: read_u32(buff, 4)?,
                offset: read_u32(buff, 8)?,
                length: read_u32(buff, 12)?,
            },
            16,
        ))
    }
}

/// Completed signing response, containing one signature per signed
/// digest (one for account-model chains, one per input for UTXO chains)
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0x82)  |     COUNT     |  ADDRESS_LEN  |   RESERVED    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    ADDRESS (UTF-8, variable)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          SIG_LEN[0]           |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /                   SIGNATURE[0] (variable)                     /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                              ...                              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SignedResp<'a> {
    /// Signing address (may be empty)
    pub address: &'a str,
    /// Signatures in the chain's canonical encoding
    pub signatures: Vec<&'a [u8], MAX_SIGNATURES>,
}

impl<'a> ApduResponse for SignedResp<'a> {
    const KIND: ResponseKind = ResponseKind::Signed;
}

impl<'a> Encode for SignedResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let sigs: usize = self.signatures.iter().map(|s| 2 + s.len()).sum();
        Ok(4 + self.address.len() + sigs)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        buff[0] = Self::KIND as u8;
        buff[1] = self.signatures.len() as u8;
        buff[2] = self.address.len() as u8;
        buff[3] = 0;
        let mut index = 4;

        index += write_bytes(buff, index, self.address.as_bytes())?;

        for s in self.signatures.iter() {
            index += write_bytes(buff, index, &(s.len() as u16).to_le_bytes())?;
            index += write_bytes(buff, index, s)?;
        }

        Ok(index)
    }
}

impl<'a> Decode<'a> for SignedResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        check_len(buff, 4)?;

        let count = buff[1] as usize;
        let address_len = buff[2] as usize;
        let mut index = 4;

        if count > MAX_SIGNATURES {
            return Err(ApduError::InvalidLength);
        }

        let address = read_str(buff, index, address_len)?;
        index += address_len;

        let mut signatures = Vec::new();
        for _ in 0..count {
            let n = read_u16(buff, index)? as usize;
            index += 2;

            let s = read_bytes(buff, index, n)?;
            index += n;

            signatures
                .push(s)
                .map_err(|_| ApduError::InvalidLength)?;
        }

        Ok((
            Self {
                address,
                signatures,
            },
            index,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn chunk_request_apdu() {
        let apdu = ChunkRequestResp { length: 452 };

        let mut buff = [0u8; 32];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 8);
    }

    #[test]
    fn subpayload_request_apdu() {
        let apdu = SubpayloadRequestResp {
            kind: SubpayloadKind::Script,
            total: 2000,
            offset: 1024,
            length: 976,
        };

        let mut buff = [0u8; 32];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 16);
    }

    #[test]
    fn signed_resp_apdu() {
        let (a, b) = ([0x11u8; 65], [0x22u8; 71]);

        let mut signatures = Vec::new();
        signatures.push(&a[..]).unwrap();
        signatures.push(&b[..]).unwrap();

        let apdu = SignedResp {
            address: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94",
            signatures,
        };

        let mut buff = [0u8; 512];
        encode_decode_apdu(&mut buff, &apdu);
    }
}
