// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Solana off-chain message signing
//!
//! Messages are signed over the off-chain message preamble followed by the
//! message body, transaction signing is not supported.
//!
//! ## Preamble (version 0):
//! ```text
//! +------------------------+---------+--------------------+--------+
//! | "\xffsolana offchain"  | VERSION | APPLICATION_DOMAIN | FORMAT |
//! |        16 bytes        |   u8    |      32 bytes      |   u8   |
//! +------------------------+---------+--------------------+--------+
//! | SIGNER_COUNT (1) |  SIGNER  | MESSAGE_LEN (u16 LE) |
//! |        u8        | 32 bytes |       2 bytes        |
//! +------------------+----------+----------------------+
//! ```

use heapless::Vec;

use hwsign_apdu::ChainTag;

use super::{base58, AddressStr, Chain, MessageEncoding, MessageRequest, PreparedMessage};
use crate::{
    engine::Error,
    keychain::{Curve, KeyNode},
    signer::Scheme,
    tokens::{TokenDescriptor, SOL},
};

/// Off-chain message signing domain
pub const SIGNING_DOMAIN: &[u8; 16] = b"\xffsolana offchain";

/// Supported off-chain message header version
pub const OFFCHAIN_VERSION: u8 = 0;

/// Maximum message length for formats 0 and 1
pub const MAX_LEN_LIMITED: usize = 1212;

/// Maximum message length for format 2
pub const MAX_LEN_EXTENDED: usize = 65515;

/// Off-chain message formats
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum MessageFormat {
    /// Printable ASCII, up to [`MAX_LEN_LIMITED`] bytes
    RestrictedAscii,
    /// UTF-8, up to [`MAX_LEN_LIMITED`] bytes
    LimitedUtf8,
    /// UTF-8, up to [`MAX_LEN_EXTENDED`] bytes
    ExtendedUtf8,
}

impl TryFrom<u8> for MessageFormat {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::RestrictedAscii),
            1 => Ok(Self::LimitedUtf8),
            2 => Ok(Self::ExtendedUtf8),
            _ => Err(Error::UnknownVariant),
        }
    }
}

impl MessageFormat {
    /// Check message content against the format
    pub fn check(&self, message: &[u8]) -> Result<(), Error> {
        let max = match self {
            Self::RestrictedAscii | Self::LimitedUtf8 => MAX_LEN_LIMITED,
            Self::ExtendedUtf8 => MAX_LEN_EXTENDED,
        };

        if message.is_empty() || message.len() > max {
            return Err(Error::InvalidMessage);
        }

        let ok = match self {
            Self::RestrictedAscii => message.iter().all(|c| (0x20..=0x7e).contains(c)),
            _ => core::str::from_utf8(message).is_ok(),
        };

        match ok {
            true => Ok(()),
            false => Err(Error::InvalidMessage),
        }
    }
}

pub struct Solana;

impl Chain for Solana {
    fn tag(&self) -> ChainTag {
        ChainTag::Solana
    }

    fn name(&self) -> &'static str {
        "Solana"
    }

    fn curve(&self) -> Curve {
        Curve::Ed25519
    }

    fn native(&self) -> &'static TokenDescriptor {
        &SOL
    }

    fn schemas(&self) -> &'static [&'static str] {
        &["m/44'/501'", "m/44'/501'/[0-1000]'", "m/44'/501'/[0-1000]'/0'"]
    }

    fn address(&self, node: &KeyNode, _path: &[u32], _chain_id: u64) -> Result<AddressStr, Error> {
        base58(node.public_key(), false)
    }

    fn prepare_message(&self, req: &MessageRequest, node: &KeyNode) -> Result<PreparedMessage, Error> {
        if req.version != OFFCHAIN_VERSION {
            return Err(Error::UnknownVariant);
        }

        let format = MessageFormat::try_from(req.format)?;
        format.check(req.message)?;

        let mut data = Vec::new();
        let domain = req.domain.unwrap_or_default();

        let len = (req.message.len() as u16).to_le_bytes();
        let parts: [&[u8]; 7] = [
            SIGNING_DOMAIN,
            &[OFFCHAIN_VERSION],
            &domain,
            &[req.format, 1],
            node.public_key(),
            &len,
            req.message,
        ];

        parts
            .iter()
            .try_for_each(|p| data.extend_from_slice(p))
            .map_err(|_| Error::InvalidLength)?;

        Ok(PreparedMessage {
            data,
            scheme: Scheme::Eddsa,
            encoding: MessageEncoding::Raw,
        })
    }
}
