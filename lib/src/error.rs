// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::Debug;
use std::fmt::Display;

use hwsign_apdu::{
    control::{FAILURE_USER_CANCELLED, FAILURE_WALLET_MISMATCH},
    ApduError,
};
use tokio::time::error::Elapsed;

/// Hardware wallet signing API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error<E: Display + Debug> {
    /// Transport error
    #[error("Transport error {0}")]
    Transport(E),

    /// APDU encoding error
    #[error("APDU encoding failed: {0}")]
    Apdu(ApduError),

    /// Device reported a failure
    #[error("Device operation failed: {message} (code: 0x{code:02x})")]
    Device { code: u8, message: String },

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    UnexpectedResponse,

    /// Timeout waiting for user
    #[error("Timeout waiting for user interaction")]
    UserTimeout,

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// User denied operation
    #[error("Operation rejected by user")]
    UserDenied,

    /// Request bound to a different wallet
    #[error("Wallet fingerprint mismatch")]
    WalletMismatch,

    /// Payload exceeds protocol limits
    #[error("Invalid payload length")]
    InvalidLength,
}

impl<E: Display + Debug> Error<E> {
    /// Map a device failure response to an error
    pub fn device(code: u8, message: &str) -> Self {
        match code {
            FAILURE_USER_CANCELLED => Error::UserDenied,
            FAILURE_WALLET_MISMATCH => Error::WalletMismatch,
            _ => Error::Device {
                code,
                message: message.to_string(),
            },
        }
    }
}

impl<E: Display + Debug> From<ApduError> for Error<E> {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::UnexpectedResponse => Error::UnexpectedResponse,
            _ => Error::Apdu(e),
        }
    }
}

impl<E: Display + Debug> From<Elapsed> for Error<E> {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}
