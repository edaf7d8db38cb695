// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address derivation APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{
    check_kind, ApduError, ApduResponse, ApduStatic, ChainTag, Instruction, ResponseKind,
    HWS_APDU_CLA,
};
use crate::{
    helpers::{check_len, read_bytes, read_chain, read_str, read_u64, write_bytes},
    path::DerivationPath,
};

bitflags::bitflags! {
    /// Address request flags
    pub struct AddressFlags: u8 {
        /// Show the address on the device for user confirmation
        const SHOW_DISPLAY = 1 << 0;
    }
}

/// Request an address (and public key) for the provided chain and path
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     CHAIN     |     FLAGS     |           RESERVED            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           CHAIN_ID                            |
/// |                        (u64, 8-byte)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    DERIVATION_PATH (see path)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct AddressReq {
    /// Chain for address encoding
    pub chain: ChainTag,
    /// Request flags
    pub flags: AddressFlags,
    /// Optional chain-specific network identifier (zero for default)
    pub chain_id: u64,
    /// Derivation path
    pub path: DerivationPath,
}

impl AddressReq {
    /// Create a new address request
    pub fn new(chain: ChainTag, path: DerivationPath, show_display: bool) -> Self {
        let mut flags = AddressFlags::empty();
        flags.set(AddressFlags::SHOW_DISPLAY, show_display);

        Self {
            chain,
            flags,
            chain_id: 0,
            path,
        }
    }

    /// Set the chain-specific network identifier
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }
}

impl ApduStatic for AddressReq {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::GetAddress as u8;
}

impl Encode for AddressReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(12 + self.path.encode_len()?)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        buff[0] = self.chain as u8;
        buff[1] = self.flags.bits();
        buff[2..4].fill(0);
        buff[4..12].copy_from_slice(&self.chain_id.to_le_bytes());
        let mut index = 12;

        index += self.path.encode(&mut buff[index..])?;

        Ok(index)
    }
}

impl DecodeOwned for AddressReq {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        check_len(buff, 12)?;

        let chain = read_chain(buff, 0)?;
        let flags = AddressFlags::from_bits_truncate(buff[1]);
        let chain_id = read_u64(buff, 4)?;
        let mut index = 12;

        let (path, n) = DerivationPath::decode_owned(&buff[index..])?;
        index += n;

        Ok((
            Self {
                chain,
                flags,
                chain_id,
                path,
            },
            index,
        ))
    }
}

/// Address response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0x81)  |  ADDRESS_LEN  |    KEY_LEN    |   RESERVED    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    DERIVATION_PATH (see path)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    ADDRESS (UTF-8, variable)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                  PUBLIC_KEY (variable length)                 /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct AddressResp<'a> {
    /// Path used for derivation
    pub path: DerivationPath,
    /// Chain-encoded address
    pub address: &'a str,
    /// Public key (33-byte compressed secp256k1 / nist256p1, 32-byte ed25519)
    pub public_key: &'a [u8],
}

impl<'a> ApduResponse for AddressResp<'a> {
    const KIND: ResponseKind = ResponseKind::Address;
}

impl<'a> Encode for AddressResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.path.encode_len()? + self.address.len() + self.public_key.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        buff[0] = Self::KIND as u8;
        buff[1] = self.address.len() as u8;
        buff[2] = self.public_key.len() as u8;
        buff[3] = 0;
        let mut index = 4;

        index += self.path.encode(&mut buff[index..])?;
        index += write_bytes(buff, index, self.address.as_bytes())?;
        index += write_bytes(buff, index, self.public_key)?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for AddressResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        check_len(buff, 4)?;

        let address_len = buff[1] as usize;
        let key_len = buff[2] as usize;
        let mut index = 4;

        let (path, n) = DerivationPath::decode_owned(&buff[index..])?;
        index += n;

        let address = read_str(buff, index, address_len)?;
        index += address_len;

        let public_key = read_bytes(buff, index, key_len)?;
        index += key_len;

        Ok((
            Self {
                path,
                address,
                public_key,
            },
            index,
        ))
    }
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn address_req_apdu() {
        let apdu = AddressReq::new(
            ChainTag::Ethereum,
            DerivationPath::from_str("m/44'/60'/0'/0/0").unwrap(),
            true,
        )
        .with_chain_id(1);

        let mut buff = [0u8; 256];
        let n = encode_decode_apdu(&mut buff, &apdu);
        assert_eq!(n, 12 + 4 + 5 * 4);
    }

    #[test]
    fn address_resp_apdu() {
        let apdu = AddressResp {
            path: DerivationPath::from_str("m/44'/501'/0'/0'").unwrap(),
            address: "GsbwXfJraMomNxBcjYLcG3mxkBUiyWXAB32fGbSMQRdW",
            public_key: &[0xab; 32],
        };

        let mut buff = [0u8; 256];
        encode_decode_apdu(&mut buff, &apdu);
    }
}
