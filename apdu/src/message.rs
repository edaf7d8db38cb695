// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing APDUs

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    check_kind,
    helpers::{check_len, read_bytes, read_chain, read_str, read_u32, write_bytes},
    path::DerivationPath,
    ApduError, ApduResponse, ApduStatic, ChainTag, Instruction, ResponseKind, HWS_APDU_CLA,
};

/// Sign an arbitrary message using the chain's message signing scheme
///
/// `FORMAT` is chain-specific (eg. solana off-chain message format),
/// `DOMAIN` is present only where `HAS_DOMAIN` is set in `FLAGS`.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     CHAIN     |    FORMAT     |     FLAGS     |   RESERVED    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     EXPECTED_FINGERPRINT                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          MESSAGE_LEN                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    DERIVATION_PATH (see path)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /             APPLICATION_DOMAIN (32 bytes, optional)           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    MESSAGE (MESSAGE_LEN bytes)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct SignMessageReq<'a> {
    /// Chain for message signing
    pub chain: ChainTag,
    /// Chain-specific message format
    pub format: u8,
    /// Expected root fingerprint of the signing wallet (zero to disable)
    pub fingerprint: u32,
    /// Signing key derivation path
    pub path: DerivationPath,
    /// Optional application domain
    pub domain: Option<[u8; 32]>,
    /// Message to be signed
    pub message: &'a [u8],
}

const HAS_DOMAIN: u8 = 1 << 0;

impl<'a> SignMessageReq<'a> {
    /// Create a new message signing request
    pub fn new(chain: ChainTag, path: DerivationPath, message: &'a [u8]) -> Self {
        Self {
            chain,
            format: 0,
            fingerprint: 0,
            path,
            domain: None,
            message,
        }
    }

    /// Set the message format
    pub fn with_format(mut self, format: u8) -> Self {
        self.format = format;
        self
    }

    /// Set the application domain
    pub fn with_domain(mut self, domain: [u8; 32]) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Bind the request to a wallet fingerprint
    pub fn with_fingerprint(mut self, fingerprint: u32) -> Self {
        self.fingerprint = fingerprint;
        self
    }
}

impl<'a> ApduStatic for SignMessageReq<'a> {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::SignMessage as u8;
}

impl<'a> Encode for SignMessageReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        let d = if self.domain.is_some() { 32 } else { 0 };
        Ok(12 + self.path.encode_len()? + d + self.message.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        buff[0] = self.chain as u8;
        buff[1] = self.format;
        buff[2] = if self.domain.is_some() { HAS_DOMAIN } else { 0 };
        buff[3] = 0;
        buff[4..8].copy_from_slice(&self.fingerprint.to_le_bytes());
        buff[8..12].copy_from_slice(&(self.message.len() as u32).to_le_bytes());
        let mut index = 12;

        index += self.path.encode(&mut buff[index..])?;

        if let Some(d) = &self.domain {
            index += write_bytes(buff, index, d)?;
        }

        index += write_bytes(buff, index, self.message)?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for SignMessageReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_len(buff, 12)?;

        let chain = read_chain(buff, 0)?;
        let format = buff[1];
        let flags = buff[2];
        let fingerprint = read_u32(buff, 4)?;
        let message_len = read_u32(buff, 8)? as usize;
        let mut index = 12;

        let (path, n) = DerivationPath::decode_owned(&buff[index..])?;
        index += n;

        let domain = match flags & HAS_DOMAIN != 0 {
            true => {
                let mut d = [0u8; 32];
                d.copy_from_slice(read_bytes(buff, index, 32)?);
                index += 32;
                Some(d)
            }
            false => None,
        };

        let message = read_bytes(buff, index, message_len)?;
        index += message_len;

        Ok((
            Self {
                chain,
                format,
                fingerprint,
                path,
                domain,
                message,
            },
            index,
        ))
    }
}

/// Message signature response
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0x85)  |    SIG_LEN    |  ADDRESS_LEN  |   RESERVED    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                     SIGNATURE (SIG_LEN bytes)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    ADDRESS (UTF-8, variable)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct MessageSignatureResp<'a> {
    /// Signature in the chain's canonical message encoding
    pub signature: &'a [u8],
    /// Signing address
    pub address: &'a str,
}

impl<'a> ApduResponse for MessageSignatureResp<'a> {
    const KIND: ResponseKind = ResponseKind::MessageSignature;
}

impl<'a> Encode for MessageSignatureResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.signature.len() + self.address.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        buff[0] = Self::KIND as u8;
        buff[1] = self.signature.len() as u8;
        buff[2] = self.address.len() as u8;
        buff[3] = 0;
        let mut index = 4;

        index += write_bytes(buff, index, self.signature)?;
        index += write_bytes(buff, index, self.address.as_bytes())?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for MessageSignatureResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        check_len(buff, 4)?;

        let sig_len = buff[1] as usize;
        let address_len = buff[2] as usize;
        let mut index = 4;

        let signature = read_bytes(buff, index, sig_len)?;
        index += sig_len;

        let address = read_str(buff, index, address_len)?;
        index += address_len;

        Ok((Self { signature, address }, index))
    }
}
