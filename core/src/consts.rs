// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Compile-time limits and protocol constants

use static_assertions::const_assert;

/// Maximum payload chunk requested from the host
pub const CHUNK_SIZE: usize = hwsign_apdu::MAX_CHUNK_LEN;

/// Maximum assembled payload length
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Maximum key derivation depth
pub const MAX_DERIVATION_DEPTH: usize = 10;

/// Minimum depth accepted by permissive path validation
pub const PERMISSIVE_MIN_DEPTH: usize = 3;

/// Failed PIN attempts before the device is wiped
pub const PIN_MAX_TRIES: u32 = 16;

/// PBKDF2 rounds used for PIN verifiers
pub const PIN_PBKDF2_ROUNDS: u32 = 10_000;

/// Maximum PIN length (digits)
pub const PIN_MAX_LEN: usize = 50;

/// Default session cache time (10 minutes)
pub const DEFAULT_CACHE_TIME_MS: u64 = 10 * 60 * 1000;

/// Application name reported in info responses
pub const APP_NAME: &str = "hwsign";

/// Application version reported in info responses
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const_assert!(MAX_DERIVATION_DEPTH <= hwsign_apdu::path::MAX_WIRE_DEPTH);
const_assert!(CHUNK_SIZE <= MAX_PAYLOAD_LEN);
const_assert!(PERMISSIVE_MIN_DEPTH <= MAX_DERIVATION_DEPTH);

// Failure codes interpreted by hosts
const_assert!(
    crate::engine::Error::UserCancelled as u8 == hwsign_apdu::control::FAILURE_USER_CANCELLED
);
const_assert!(crate::engine::Error::PinInvalid as u8 == hwsign_apdu::control::FAILURE_PIN_INVALID);
const_assert!(
    crate::engine::Error::WalletMismatch as u8 == hwsign_apdu::control::FAILURE_WALLET_MISMATCH
);
