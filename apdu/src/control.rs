// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Cancellation, acknowledgement and failure APDUs

use encdec::{Decode, DecodeOwned, Encode};

use crate::{
    check_kind,
    helpers::{check_len, read_str, write_bytes},
    ApduError, ApduResponse, ApduStatic, Instruction, ResponseKind, HWS_APDU_CLA,
};

/// Cancel any in-flight operation, accepted at every suspension point.
///
/// The device terminates the pending request with a `UserCancelled` [FailureResp],
/// or responds with [AckResp] where no request was in flight.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct CancelReq;

impl ApduStatic for CancelReq {
    const CLA: u8 = HWS_APDU_CLA;
    const INS: u8 = Instruction::Cancel as u8;
}

impl Encode for CancelReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl DecodeOwned for CancelReq {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(_buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        Ok((Self, 0))
    }
}

/// Empty acknowledgement response
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct AckResp;

impl ApduResponse for AckResp {
    const KIND: ResponseKind = ResponseKind::Ack;
}

impl Encode for AckResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(1)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        check_len(buff, 1)?;
        buff[0] = Self::KIND as u8;
        Ok(1)
    }
}

impl DecodeOwned for AckResp {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        check_kind::<Self>(buff)?;
        Ok((Self, 1))
    }
}

/// Failure code reported when the user cancels or rejects a request
pub const FAILURE_USER_CANCELLED: u8 = 0x30;

/// Failure code reported for an invalid PIN
pub const FAILURE_PIN_INVALID: u8 = 0x31;

/// Failure code reported when the request is bound to another wallet
pub const FAILURE_WALLET_MISMATCH: u8 = 0x33;

/// Failure response, terminates the current request
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  KIND (0xFF)  |     CODE      |  MESSAGE_LEN  |   RESERVED    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                    MESSAGE (UTF-8, variable)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FailureResp<'a> {
    /// Engine error code
    pub code: u8,
    /// Human readable failure message
    pub message: &'a str,
}

impl<'a> FailureResp<'a> {
    pub fn new(code: u8, message: &'a str) -> Self {
        Self { code, message }
    }
}

impl<'a> ApduResponse for FailureResp<'a> {
    const KIND: ResponseKind = ResponseKind::Failure;
}

impl<'a> Encode for FailureResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.message.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        check_len(buff, self.encode_len()?)?;

        buff[0] = Self::KIND as u8;
        buff[1] = self.code;
        buff[2] = self.message.len() as u8;
        buff[3] = 0;

        Ok(4 + write_bytes(buff, 4, self.message.as_bytes())?)
    }
}

impl<'a> Decode<'a> for FailureResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self::Output, usize), ApduError> {
        check_kind::<Self>(buff)?;
        check_len(buff, 4)?;

        let code = buff[1];
        let n = buff[2] as usize;
        let message = read_str(buff, 4, n)?;

        Ok((Self { code, message }, 4 + n))
    }
}
