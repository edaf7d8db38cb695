// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / message definitions for hardware wallet signing requests
//!
//! This module provides a protocol specification and reference implementation for communication
//! between a host and a signing device.
//!
//! Messages use a primitive binary encoding to simplify implementation with unsupported languages and platforms.
//! Each request carries a class and instruction byte (see [ApduStatic]), each response is
//! prefixed with a [ResponseKind] tag so the host can distinguish suspension points
//! (chunk / sub-payload requests) and failures from completed operations.
//!
//! Encodings are intended to be _roughly_ equivalent to packed c structures while maintaining
//! 32-bit field alignment to reduce the need for unaligned access on constrained platforms.
//! All field encodings are little-endian, because most of the world is these days.
//!

#![cfg_attr(not(feature = "std"), no_std)]

use core::fmt::Debug;

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

pub mod address;
pub mod app_info;
pub mod control;
pub mod message;
pub mod path;
pub mod prelude;
pub mod tx;

mod helpers;

/// Signing APDU Class
pub const HWS_APDU_CLA: u8 = 0xe0;

/// Protocol version, reported in [`InfoResp`][app_info::InfoResp]
pub const HWS_PROTO_VERSION: u8 = 0x01;

/// Maximum size of a payload chunk carried in a single message
pub const MAX_CHUNK_LEN: usize = 1024;

/// Maximum number of signatures in a [`SignedResp`][tx::SignedResp]
pub const MAX_SIGNATURES: usize = 16;

/// Maximum encoded message size (header excluded)
pub const MAX_MESSAGE_LEN: usize = 2048;

/// Request instruction codes
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch device / application info
    GetInfo = 0x00,

    /// Derive (and optionally display) an address
    GetAddress = 0x10,

    /// Start a transaction signing operation
    SignTxInit = 0x20,

    /// Provide a requested payload chunk
    ChunkAck = 0x21,

    /// Provide a requested sub-payload
    SubpayloadAck = 0x22,

    /// Sign an arbitrary message
    SignMessage = 0x30,

    /// Cancel any in-flight operation
    Cancel = 0x40,
}

/// Response kind, encoded as the first byte of every response
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum ResponseKind {
    Info = 0x80,
    Address = 0x81,
    Signed = 0x82,
    ChunkRequest = 0x83,
    SubpayloadRequest = 0x84,
    MessageSignature = 0x85,
    Ack = 0x86,
    Failure = 0xff,
}

/// Chain identifiers, selecting the codec used for a request
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum ChainTag {
    Bitcoin = 0x01,
    Ethereum = 0x02,
    Alephium = 0x03,
    Solana = 0x04,
}

/// Protocol encoding / decoding errors
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum ApduError {
    /// Buffer too short or length field out of range
    InvalidLength,
    /// Invalid field encoding
    InvalidEncoding,
    /// Invalid UTF-8 string
    InvalidUtf8,
    /// Response kind did not match the expected response
    UnexpectedResponse,
}

#[cfg(feature = "std")]
impl std::error::Error for ApduError {}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            #[allow(unreachable_patterns)]
            _ => ApduError::InvalidEncoding,
        }
    }
}

/// Static class and instruction codes for request messages
pub trait ApduStatic {
    /// Class ID for APDU commands
    const CLA: u8;

    /// Instruction ID for APDU commands
    const INS: u8;
}

/// Static response tag for response messages
pub trait ApduResponse {
    const KIND: ResponseKind;
}

/// Read the [ResponseKind] tag from an encoded response
pub fn response_kind(buff: &[u8]) -> Result<ResponseKind, ApduError> {
    match buff.first() {
        Some(b) => ResponseKind::try_from(*b).map_err(|_| ApduError::InvalidEncoding),
        None => Err(ApduError::InvalidLength),
    }
}

/// Check the response tag prior to decoding a response object
pub(crate) fn check_kind<R: ApduResponse>(buff: &[u8]) -> Result<(), ApduError> {
    match response_kind(buff)? {
        k if k == R::KIND => Ok(()),
        _k => {
            #[cfg(feature = "log")]
            log::debug!("unexpected response {} (expected {})", _k, R::KIND);

            Err(ApduError::UnexpectedResponse)
        }
    }
}

/// Helper macro for encoding `bitflags` types
#[macro_export]
macro_rules! encdec_bitflags {
    ($b:ty) => {
        impl encdec::Encode for $b {
            type Error = ApduError;

            fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
                let bits: u8 = self.bits();
                encdec::Encode::encode(&bits, buff).map_err(|e| e.into())
            }

            fn encode_len(&self) -> Result<usize, Self::Error> {
                let bits: u8 = self.bits();
                encdec::Encode::encode_len(&bits).map_err(|e| e.into())
            }
        }

        impl encdec::DecodeOwned for $b {
            type Output = $b;
            type Error = ApduError;

            fn decode_owned(buff: &[u8]) -> Result<(Self, usize), Self::Error> {
                if buff.is_empty() {
                    return Err(ApduError::InvalidLength);
                }
                let v = <$b>::from_bits_truncate(buff[0]);
                Ok((v, 1))
            }
        }
    };
}
