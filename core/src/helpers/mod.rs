// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hashing and display helpers shared by chain codecs

use core::fmt::Write;

use blake2::{digest::consts::U32, Blake2b};
use heapless::String;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::codec::U256;

/// Maximum length of a rendered amount
pub const AMOUNT_LEN: usize = 96;

/// Rendered amount string
pub type AmountStr = String<AMOUNT_LEN>;

/// Blake2b with a 256-bit output
pub type Blake2b256 = Blake2b<U32>;

/// SHA-256 of the provided data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256 of the provided data
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD-160 of SHA-256 of the provided data
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Keccak-256 of the provided data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Blake2b-256 of the provided data
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// BIP-340 tagged hash over the concatenation of `parts`
pub fn tagged_hash(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let t = Sha256::digest(tag.as_bytes());

    let mut h = Sha256::new();
    h.update(t);
    h.update(t);
    for p in parts {
        h.update(p);
    }

    h.finalize().into()
}

/// Render an EIP-55 checksummed ethereum address
pub fn eip55(addr: &[u8; 20]) -> String<42> {
    let mut lower = [0u8; 40];
    for (i, b) in addr.iter().enumerate() {
        lower[i * 2] = HEX_CHARS[(b >> 4) as usize];
        lower[i * 2 + 1] = HEX_CHARS[(b & 0xf) as usize];
    }

    let h = keccak256(&lower);

    let mut s = String::new();
    let _ = s.push_str("0x");

    for (i, c) in lower.iter().enumerate() {
        let nibble = match i % 2 {
            0 => h[i / 2] >> 4,
            _ => h[i / 2] & 0xf,
        };

        let c = match nibble >= 8 {
            true => c.to_ascii_uppercase(),
            false => *c,
        };
        let _ = s.push(c as char);
    }

    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Format a token value with the provided decimals and symbol,
/// always showing at least one fractional digit (ie. `1.0 ETH`)
pub fn fmt_token_val(value: &U256, decimals: u8, symbol: &str) -> AmountStr {
    let mut digits: String<80> = String::new();
    let _ = write!(&mut digits, "{value}");

    let mut s = AmountStr::new();
    let decimals = decimals as usize;

    if decimals == 0 {
        let _ = write!(&mut s, "{digits} {symbol}");
        return s;
    }

    // Left-pad so there is at least one integer digit
    let mut padded: String<340> = String::new();
    for _ in digits.len()..decimals + 1 {
        let _ = padded.push('0');
    }
    let _ = padded.push_str(&digits);

    let (int, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    let frac = match frac.is_empty() {
        true => "0",
        false => frac,
    };

    let _ = write!(&mut s, "{int}.{frac} {symbol}");
    s
}

/// Format a value for a token with unknown decimals
pub fn fmt_unknown_val(value: &U256) -> AmountStr {
    let mut s = AmountStr::new();
    let _ = write!(&mut s, "{value} units");
    s
}

/// Write lower-case hex into a fixed capacity string,
/// truncating with `..` where the capacity is exceeded
pub fn fmt_hex<const N: usize>(data: &[u8]) -> String<N> {
    let mut s = String::new();

    for b in data {
        if s.len() + 2 > N.saturating_sub(2) {
            let _ = s.push_str("..");
            break;
        }
        let _ = write!(&mut s, "{b:02x}");
    }

    s
}
