// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SLIP-0010 master and child key derivation

use hmac::{Hmac, Mac};
use k256::elliptic_curve::{Field, PrimeField};
use sha2::Sha512;
use zeroize::Zeroize;

use super::Curve;
use crate::engine::Error;

type HmacSha512 = Hmac<Sha512>;

/// Raw (private key, chain code) pair
pub(crate) struct Extended {
    pub key: [u8; 32],
    pub chain_code: [u8; 32],
}

impl Drop for Extended {
    fn drop(&mut self) {
        self.key.zeroize();
        self.chain_code.zeroize();
    }
}

/// HMAC-SHA512 over the concatenation of `parts`
fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 64], Error> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
    for p in parts {
        mac.update(p);
    }

    Ok(mac.finalize().into_bytes().into())
}

fn split(mut i: [u8; 64]) -> Extended {
    let mut e = Extended {
        key: [0u8; 32],
        chain_code: [0u8; 32],
    };
    e.key.copy_from_slice(&i[..32]);
    e.chain_code.copy_from_slice(&i[32..]);
    i.zeroize();
    e
}

/// Check a candidate private key is a valid non-zero scalar for the curve
fn valid_scalar(curve: Curve, k: &[u8; 32]) -> bool {
    match curve {
        Curve::Secp256k1 => {
            let s: Option<k256::Scalar> = k256::Scalar::from_repr((*k).into()).into();
            s.map(|s| !bool::from(s.is_zero())).unwrap_or(false)
        }
        Curve::Nist256p1 => {
            let s: Option<p256::Scalar> = p256::Scalar::from_repr((*k).into()).into();
            s.map(|s| !bool::from(s.is_zero())).unwrap_or(false)
        }
        Curve::Ed25519 | Curve::Ed25519Keccak => true,
    }
}

/// Compute `(il + k) mod n`, `None` if `il >= n` or the result is zero
fn add_scalars(curve: Curve, il: &[u8; 32], k: &[u8; 32]) -> Option<[u8; 32]> {
    macro_rules! add {
        ($s:ty) => {{
            let a: Option<$s> = <$s>::from_repr((*il).into()).into();
            let b: Option<$s> = <$s>::from_repr((*k).into()).into();
            let r = a? + b?;
            if bool::from(r.is_zero()) {
                return None;
            }
            Some(r.to_repr().into())
        }};
    }

    match curve {
        Curve::Secp256k1 => add!(k256::Scalar),
        Curve::Nist256p1 => add!(p256::Scalar),
        Curve::Ed25519 | Curve::Ed25519Keccak => None,
    }
}

/// Derive the master key for a curve from a seed
pub(crate) fn master(curve: Curve, seed: &[u8]) -> Result<Extended, Error> {
    let mut i = hmac_sha512(curve.seed_key(), &[seed])?;

    // Retry with I as the new seed while IL is not a valid scalar
    loop {
        let e = split(i);
        if valid_scalar(curve, &e.key) {
            return Ok(e);
        }

        let mut s = [0u8; 64];
        s[..32].copy_from_slice(&e.key);
        s[32..].copy_from_slice(&e.chain_code);
        i = hmac_sha512(curve.seed_key(), &[&s])?;
        s.zeroize();
    }
}

/// Derive a child key
///
/// `public_key` is the compressed parent public key, used for
/// non-hardened derivation on weierstrass curves.
pub(crate) fn child(
    curve: Curve,
    parent: &Extended,
    public_key: &[u8],
    index: u32,
) -> Result<Extended, Error> {
    let hardened = index & super::HARDENED != 0;
    let idx = index.to_be_bytes();

    if !hardened && !curve.supports_public_derivation() {
        return Err(Error::InvalidPathForCurve);
    }

    let mut i = match hardened {
        true => hmac_sha512(&parent.chain_code, &[&[0x00], &parent.key, &idx])?,
        false => hmac_sha512(&parent.chain_code, &[public_key, &idx])?,
    };

    if !curve.supports_public_derivation() {
        return Ok(split(i));
    }

    loop {
        let e = split(i);

        if let Some(k) = add_scalars(curve, &e.key, &parent.key) {
            return Ok(Extended {
                key: k,
                chain_code: e.chain_code,
            });
        }

        // Invalid child, retry with 0x01 || IR || index
        i = hmac_sha512(&parent.chain_code, &[&[0x01], &e.chain_code, &idx])?;
    }
}
