// Copyright (c) 2022-2023 The MobileCoin Foundation

use hwsign_apdu::ApduError;

/// [Engine][super::Engine] errors
///
/// Codes are stable and reported to the host via
/// [`FailureResp`][hwsign_apdu::control::FailureResp].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Invalid argument length
    #[cfg_attr(feature = "thiserror", error("Invalid argument length"))]
    InvalidLength = 0x00,

    /// Unexpected event
    #[cfg_attr(feature = "thiserror", error("Unexpected event"))]
    UnexpectedEvent = 0x01,

    /// Another request is in flight
    #[cfg_attr(feature = "thiserror", error("device busy"))]
    Busy = 0x02,

    /// Signing error
    #[cfg_attr(feature = "thiserror", error("Signing error"))]
    SignError = 0x03,

    /// Invalid key (derivation or parsing failed)
    #[cfg_attr(feature = "thiserror", error("invalid key"))]
    InvalidKey = 0x05,

    /// Message encoding failed
    #[cfg_attr(feature = "thiserror", error("message encoding failed"))]
    EncodingFailed = 0x0b,

    /// No seed available
    #[cfg_attr(feature = "thiserror", error("device not initialized"))]
    NotInitialized = 0x10,

    /// Path does not match any schema for the chain
    #[cfg_attr(feature = "thiserror", error("invalid derivation path"))]
    InvalidPath = 0x11,

    /// Path not supported by the selected curve
    #[cfg_attr(feature = "thiserror", error("derivation path invalid for curve"))]
    InvalidPathForCurve = 0x12,

    /// Path exceeds maximum derivation depth
    #[cfg_attr(feature = "thiserror", error("derivation path too deep"))]
    PathTooDeep = 0x13,

    /// Curve not advertised by this device
    #[cfg_attr(feature = "thiserror", error("unsupported curve"))]
    UnsupportedCurve = 0x14,

    /// Operation not supported by the selected chain
    #[cfg_attr(feature = "thiserror", error("unsupported chain feature"))]
    UnsupportedChainFeature = 0x15,

    /// Payload ended before a field was complete
    #[cfg_attr(feature = "thiserror", error("codec underflow"))]
    CodecUnderflow = 0x20,

    /// Payload contains bytes following the decoded frame
    #[cfg_attr(feature = "thiserror", error("trailing data"))]
    TrailingData = 0x21,

    /// Unknown enumerator in payload
    #[cfg_attr(feature = "thiserror", error("unknown variant"))]
    UnknownVariant = 0x22,

    /// Chunk stream ended early
    #[cfg_attr(feature = "thiserror", error("payload truncated"))]
    PayloadTruncated = 0x23,

    /// Running payload digest did not match the assembled payload
    #[cfg_attr(feature = "thiserror", error("payload digest mismatch"))]
    HashMismatch = 0x24,

    /// Sub-payload did not match the declared window
    #[cfg_attr(feature = "thiserror", error("sub-payload mismatch"))]
    SubpayloadMismatch = 0x25,

    /// Amounts do not balance or overflow
    #[cfg_attr(feature = "thiserror", error("invalid amount"))]
    InvalidAmount = 0x26,

    /// Change output does not belong to this wallet
    #[cfg_attr(feature = "thiserror", error("invalid change output"))]
    InvalidChange = 0x27,

    /// Message content not valid for the declared format
    #[cfg_attr(feature = "thiserror", error("invalid message"))]
    InvalidMessage = 0x28,

    /// User cancelled the operation
    #[cfg_attr(feature = "thiserror", error("user cancelled"))]
    UserCancelled = 0x30,

    /// PIN verification failed
    #[cfg_attr(feature = "thiserror", error("invalid PIN"))]
    PinInvalid = 0x31,

    /// PIN entry cancelled
    #[cfg_attr(feature = "thiserror", error("PIN entry cancelled"))]
    PinCancelled = 0x32,

    /// Request bound to another wallet
    #[cfg_attr(feature = "thiserror", error("wallet mismatch"))]
    WalletMismatch = 0x33,

    /// Storage read / write failed
    #[cfg_attr(feature = "thiserror", error("storage error"))]
    Storage = 0x40,

    /// Unknown / not-yet defined error (placeholder)
    #[cfg_attr(feature = "thiserror", error("unknown"))]
    Unknown = 0xf0,
}

impl Error {
    /// Error code for transport encoding
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Static description for transport encoding
    pub fn message(&self) -> &'static str {
        use Error::*;

        match self {
            InvalidLength => "invalid length",
            UnexpectedEvent => "unexpected event",
            Busy => "device busy",
            SignError => "signing failed",
            InvalidKey => "invalid key",
            EncodingFailed => "encoding failed",
            NotInitialized => "device not initialized",
            InvalidPath => "invalid path",
            InvalidPathForCurve => "invalid path for curve",
            PathTooDeep => "path too deep",
            UnsupportedCurve => "unsupported curve",
            UnsupportedChainFeature => "unsupported chain feature",
            CodecUnderflow => "codec underflow",
            TrailingData => "trailing data",
            UnknownVariant => "unknown variant",
            PayloadTruncated => "payload truncated",
            HashMismatch => "payload digest mismatch",
            SubpayloadMismatch => "sub-payload mismatch",
            InvalidAmount => "invalid amount",
            InvalidChange => "invalid change output",
            InvalidMessage => "invalid message",
            UserCancelled => "user cancelled",
            PinInvalid => "invalid PIN",
            PinCancelled => "PIN cancelled",
            WalletMismatch => "wallet mismatch",
            Storage => "storage error",
            Unknown => "unknown",
        }
    }

    /// Errors that terminate a request due to user action
    /// (not logged as errors)
    pub fn is_user_action(&self) -> bool {
        matches!(
            self,
            Error::UserCancelled | Error::PinCancelled | Error::PinInvalid
        )
    }
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidLength => Error::InvalidLength,
            _ => Error::EncodingFailed,
        }
    }
}
