// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tests for hardware wallet signing integration.
//!
//! Generic over [hwsign::Exchange] for reuse.
//!

pub mod vectors;

pub mod address;

pub mod transaction;

pub mod message;
