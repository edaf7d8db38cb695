// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Application Information APDUs

use encdec::{Decode, DecodeOwned, Encode};

use super::{
    check_kind, ApduError, ApduResponse, ApduStatic, Instruction, ResponseKind, HWS_APDU_CLA,
};
use crate::helpers::{check_len, read_str, read_u32, write_bytes};

/// Fetch application info APDU
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct InfoReq {}

impl ApduStatic for InfoReq {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::GetInfo as u8;
}

impl Encode for InfoReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for InfoReq {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self {}, 0))
    }
}

bitflags::bitflags! {
    /// Application info flags
    pub struct AppFlags: u8 {
        /// Device holds a seed
        const INITIALIZED = 1 << 0;
        /// Session is unlocked for key requests
        const UNLOCKED = 1 << 1;
        /// A PIN is configured
        const PIN_SET = 1 << 2;
        /// Session is bound to a passphrase
        const PASSPHRASE = 1 << 3;
        /// A signing request is in flight
        const BUSY = 1 << 4;
        /// Seed backup uses an extendable share format
        const EXTENDABLE_BACKUP = 1 << 5;
    }
}

bitflags::bitflags! {
    /// Curves advertised by the device
    pub struct CurveFlags: u8 {
        const SECP256K1 = 1 << 0;
        const ED25519 = 1 << 1;
        const ED25519_KECCAK = 1 << 2;
        const NIST256P1 = 1 << 3;
    }
}

crate::encdec_bitflags!(AppFlags);
crate::encdec_bitflags!(CurveFlags);

/// Application information response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0x80)  |   PROTO_VER   |     FLAGS     |    CURVES     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   NAME_LEN    |  VERSION_LEN  |           RESERVED            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       ROOT_FINGERPRINT                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                             NAME...                           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                            VERSION...                         /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `ROOT_FINGERPRINT` is zero while the session is locked.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct InfoResp<'a> {
    /// Protocol version
    pub proto: u8,

    /// Application flags
    pub flags: AppFlags,

    /// Advertised curves
    pub curves: CurveFlags,

    /// Root node fingerprint (zero while locked)
    pub root_fingerprint: u32,

    /// Application name
    pub name: &'a str,

    /// Application version
    pub version: &'a str,
}

impl<'a> InfoResp<'a> {
    /// Create a new application info response
    pub fn new(
        proto: u8,
        name: &'a str,
        version: &'a str,
        flags: AppFlags,
        curves: CurveFlags,
        root_fingerprint: u32,
    ) -> Self {
        Self {
            proto,
            flags,
            curves,
            root_fingerprint,
            name,
            version,
        }
    }
}

impl<'a> ApduResponse for InfoResp<'a> {
    const KIND: ResponseKind = ResponseKind::Info;
}

impl<'a> Encode for InfoResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(12 + self.name.len() + self.version.len())
    }

    /// Encode an app info APDU into the provided buffer
    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        // Set header
        buff[0] = Self::KIND as u8;
        buff[1] = self.proto;
        buff[2] = self.flags.bits();
        buff[3] = self.curves.bits();
        buff[4] = self.name.len() as u8;
        buff[5] = self.version.len() as u8;
        buff[6..8].fill(0);
        buff[8..12].copy_from_slice(&self.root_fingerprint.to_le_bytes());
        let mut index = 12;

        // Write name and version
        index += write_bytes(buff, index, self.name.as_bytes())?;
        index += write_bytes(buff, index, self.version.as_bytes())?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for InfoResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        check_len(buff, 12)?;

        let proto = buff[1];
        let flags = AppFlags::from_bits_truncate(buff[2]);
        let curves = CurveFlags::from_bits_truncate(buff[3]);
        let name_len = buff[4] as usize;
        let version_len = buff[5] as usize;
        let root_fingerprint = read_u32(buff, 8)?;

        let mut index = 12;
        let name = read_str(buff, index, name_len)?;
        index += name_len;

        let version = read_str(buff, index, version_len)?;
        index += version_len;

        Ok((
            Self {
                proto,
                flags,
                curves,
                root_fingerprint,
                name,
                version,
            },
            index,
        ))
    }
}
