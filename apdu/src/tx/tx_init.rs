// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    helpers::{check_len, read_bytes, read_chain, read_u16, read_u32, read_u64, write_bytes},
    path::DerivationPath,
    ApduError, ApduStatic, ChainTag, Instruction, HWS_APDU_CLA, MAX_CHUNK_LEN,
};

bitflags::bitflags! {
    /// Transaction request flags
    pub struct SignTxFlags: u8 {
        /// Request delivered via QR transport, intermediate screens are never skipped
        const QR_TRANSPORT = 1 << 0;
    }
}

/// Transaction initialisation APDU, starts a signing operation with the
/// first chunk of the payload and the declared total payload length.
///
/// When `TOTAL_LENGTH` exceeds `CHUNK_LEN` the device responds with
/// [`ChunkRequestResp`][super::ChunkRequestResp] until the payload is complete.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     CHAIN     |     FLAGS     |           CHUNK_LEN           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         TOTAL_LENGTH                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           CHAIN_ID                            |
/// |                        (u64, 8-byte)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     EXPECTED_FINGERPRINT                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    DERIVATION_PATH (see path)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                  INITIAL_CHUNK (CHUNK_LEN bytes)              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// An `EXPECTED_FINGERPRINT` of zero disables wallet binding.
#[derive(Clone, PartialEq, Debug)]
pub struct SignTxInit<'a> {
    /// Chain codec for the payload
    pub chain: ChainTag,
    /// Request flags
    pub flags: SignTxFlags,
    /// Declared total payload length
    pub total_length: u32,
    /// Chain-specific network identifier (EIP-155 chain id for ethereum)
    pub chain_id: u64,
    /// Expected root fingerprint of the signing wallet (zero to disable)
    pub fingerprint: u32,
    /// Signing key derivation path
    pub path: DerivationPath,
    /// First payload chunk
    pub initial_chunk: &'a [u8],
}

impl<'a> SignTxInit<'a> {
    /// Create a new transaction init request, `total_length` is the
    /// length of the complete payload of which `initial_chunk` is a prefix
    pub fn new(
        chain: ChainTag,
        path: DerivationPath,
        total_length: u32,
        initial_chunk: &'a [u8],
    ) -> Self {
        Self {
            chain,
            flags: SignTxFlags::empty(),
            total_length,
            chain_id: 0,
            fingerprint: 0,
            path,
            initial_chunk,
        }
    }

    /// Set the chain-specific network identifier
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Bind the request to a wallet fingerprint
    pub fn with_fingerprint(mut self, fingerprint: u32) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Set request flags
    pub fn with_flags(mut self, flags: SignTxFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl<'a> ApduStatic for SignTxInit<'a> {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::SignTxInit as u8;
}

impl<'a> Encode for SignTxInit<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(20 + self.path.encode_len()? + self.initial_chunk.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if self.initial_chunk.len() > MAX_CHUNK_LEN {
            return Err(ApduError::InvalidLength);
        }
        check_len(buff, self.encode_len()?)?;

        buff[0] = self.chain as u8;
        buff[1] = self.flags.bits();
        buff[2..4].copy_from_slice(&(self.initial_chunk.len() as u16).to_le_bytes());
        buff[4..8].copy_from_slice(&self.total_length.to_le_bytes());
        buff[8..16].copy_from_slice(&self.chain_id.to_le_bytes());
        buff[16..20].copy_from_slice(&self.fingerprint.to_le_bytes());
        let mut index = 20;

        index += self.path.encode(&mut buff[index..])?;
        index += write_bytes(buff, index, self.initial_chunk)?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for SignTxInit<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_len(buff, 20)?;

        let chain = read_chain(buff, 0)?;
        let flags = SignTxFlags::from_bits_truncate(buff[1]);
        let chunk_len = read_u16(buff, 2)? as usize;
        let total_length = read_u32(buff, 4)?;
        let chain_id = read_u64(buff, 8)?;
        let fingerprint = read_u32(buff, 16)?;
        let mut index = 20;

        if chunk_len > MAX_CHUNK_LEN {
            return Err(ApduError::InvalidLength);
        }

        let (path, n) = DerivationPath::decode_owned(&buff[index..])?;
        index += n;

        let initial_chunk = read_bytes(buff, index, chunk_len)?;
        index += chunk_len;

        Ok((
            Self {
                chain,
                flags,
                total_length,
                chain_id,
                fingerprint,
                path,
                initial_chunk,
            },
            index,
        ))
    }
}
