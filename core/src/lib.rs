// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware wallet signing core
//!
//! This provides a common [Engine][engine] supporting per-chain transaction
//! and message signing for execution on hardware wallets.
//!
//! Interactions with the [Engine][engine] are performed via [Event][engine::Event]s and [Output][engine::Output]s,
//! see [hwsign_apdu] for APDU objects and wire encodings. Platform support
//! (PIN entry, confirmation screens, time) is provided via the
//! [Driver][engine::Driver] trait, persistent configuration via
//! [Storage][storage::Storage].
//!
//! ## Operations
//!
//! Prior to interacting with a hardware wallet the client should issue an
//! [`InfoReq`][hwsign_apdu::app_info::InfoReq] to fetch an
//! [`InfoResp`][hwsign_apdu::app_info::InfoResp] containing the protocol
//! version, advertised curves, and the root fingerprint of the unlocked wallet.
//!
//! Requests requiring keys first pass through the [session][session] gate,
//! prompting for the PIN where one is configured.
//!
//! ### Requesting addresses
//!
//! Addresses are requested via [`AddressReq`][hwsign_apdu::address::AddressReq],
//! returning an [`AddressResp`][hwsign_apdu::address::AddressResp] containing
//! the chain-encoded address and public key. Where `SHOW_DISPLAY` is set the
//! address is displayed for user confirmation.
//!
//! ### Signing a transaction
//!
//! 1. Issue [`SignTxInit`][hwsign_apdu::tx::SignTxInit] with the chain, signing
//!    path, total payload length and the initial chunk of the payload
//! 2. While the device responds with a
//!    [`ChunkRequestResp`][hwsign_apdu::tx::ChunkRequestResp], issue a
//!    [`ChunkAck`][hwsign_apdu::tx::ChunkAck] containing the next `length` bytes
//! 3. Where the decoded transaction declares a sub-payload (ie. contract
//!    bytecode) the device responds with a
//!    [`SubpayloadRequestResp`][hwsign_apdu::tx::SubpayloadRequestResp],
//!    for each piece, issue a [`SubpayloadAck`][hwsign_apdu::tx::SubpayloadAck]
//!    containing `length` bytes of the sub-payload from `offset`, or empty in
//!    response to the first request to display only a digest
//! 4. Following user confirmation the device responds with a
//!    [`SignedResp`][hwsign_apdu::tx::SignedResp] containing signatures for each input
//!
//! ### Signing a message
//!
//! Issue [`SignMessageReq`][hwsign_apdu::message::SignMessageReq], returning
//! a [`MessageSignatureResp`][hwsign_apdu::message::MessageSignatureResp]
//! following user confirmation.
//!
//! Any failure (or cancellation via [`CancelReq`][hwsign_apdu::control::CancelReq])
//! is reported via [`FailureResp`][hwsign_apdu::control::FailureResp]
//! containing an [Error][engine::Error] code.

#![cfg_attr(not(feature = "std"), no_std)]

pub use hwsign_apdu::{self as apdu};

pub mod assembler;
pub mod chain;
pub mod codec;
pub mod consts;
pub mod engine;
pub mod helpers;
pub mod keychain;
pub mod orchestrator;
pub mod path;
pub mod session;
pub mod signer;
pub mod storage;
pub mod tokens;
