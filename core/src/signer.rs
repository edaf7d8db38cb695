// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signature production for derived keys
//!
//! ECDSA schemes sign a 32-byte prehash supplied by the chain codec,
//! EdDSA schemes sign exactly the supplied bytes and never re-hash them.

use ed25519_dalek::Signer as _;
use heapless::Vec;
use k256::elliptic_curve::{point::AffineCoordinates, PrimeField};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use sha3::Keccak512;

use crate::{
    engine::Error,
    helpers::tagged_hash,
    keychain::{expand_keccak, Curve, KeyNode},
};

/// Maximum encoded signature length (DER + sighash byte)
pub const MAX_SIGNATURE_LEN: usize = 73;

/// Offset applied to recovery ids in legacy encodings
pub const LEGACY_V_OFFSET: u8 = 27;

/// Signature schemes
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Scheme {
    /// secp256k1 ECDSA, `r || s || v` with `v` in `{0, 1}`
    EcdsaRecoverable,
    /// secp256k1 ECDSA, DER encoded
    EcdsaDer,
    /// nist256p1 ECDSA, `r || s`
    P256,
    /// BIP-340 schnorr, optionally applying the taproot key-path tweak
    Schnorr(Option<Tweak>),
    /// ed25519 / ed25519-keccak per the node curve
    Eddsa,
}

/// Taproot key-path tweak
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Tweak {
    pub merkle_root: Option<[u8; 32]>,
}

/// Produced signature
#[derive(Clone, PartialEq, Debug)]
pub struct Signature {
    pub bytes: Vec<u8, MAX_SIGNATURE_LEN>,
    pub recovery: Option<u8>,
    pub public_key: Vec<u8, 33>,
}

impl Signature {
    fn new(bytes: &[u8], recovery: Option<u8>, node: &KeyNode) -> Result<Self, Error> {
        Ok(Self {
            bytes: Vec::from_slice(bytes).map_err(|_| Error::SignError)?,
            recovery,
            public_key: Vec::from_slice(node.public_key()).map_err(|_| Error::SignError)?,
        })
    }
}

/// Sign `data` using the provided scheme
///
/// `aux` supplies auxiliary randomness for BIP-340 signatures.
#[cfg_attr(feature = "noinline", inline(never))]
pub fn sign(node: &KeyNode, scheme: Scheme, data: &[u8], aux: &[u8; 32]) -> Result<Signature, Error> {
    let curve_ok = match scheme {
        Scheme::EcdsaRecoverable | Scheme::EcdsaDer | Scheme::Schnorr(_) => {
            node.curve() == Curve::Secp256k1
        }
        Scheme::P256 => node.curve() == Curve::Nist256p1,
        Scheme::Eddsa => node.curve().is_ed25519(),
    };
    if !curve_ok {
        return Err(Error::UnsupportedCurve);
    }

    match scheme {
        Scheme::EcdsaRecoverable => {
            let s = sign_recoverable(node, prehash(data)?)?;
            Signature::new(&s, Some(s[64]), node)
        }
        Scheme::EcdsaDer => {
            let s = sign_recoverable(node, prehash(data)?)?;
            let sig = k256::ecdsa::Signature::from_slice(&s[..64]).map_err(|_| Error::SignError)?;
            Signature::new(sig.to_der().as_bytes(), Some(s[64]), node)
        }
        Scheme::P256 => {
            let sk = p256::ecdsa::SigningKey::from_bytes(&p256::FieldBytes::from(
                *node.private_key(),
            ))
            .map_err(|_| Error::InvalidKey)?;
            let s: p256::ecdsa::Signature =
                sk.sign_prehash(prehash(data)?).map_err(|_| Error::SignError)?;
            Signature::new(&s.to_bytes(), None, node)
        }
        Scheme::Schnorr(tweak) => {
            let s = sign_schnorr(node, data, tweak, aux)?;
            Signature::new(&s, None, node)
        }
        Scheme::Eddsa => {
            let s = sign_eddsa(node, data)?;
            Signature::new(&s, None, node)
        }
    }
}

fn prehash(data: &[u8]) -> Result<&[u8; 32], Error> {
    data.try_into().map_err(|_| Error::InvalidLength)
}

/// secp256k1 ECDSA over a prehash, returning `r || s || v`
pub fn sign_recoverable(node: &KeyNode, prehash: &[u8; 32]) -> Result<[u8; 65], Error> {
    let sk = k256::ecdsa::SigningKey::from_bytes(&k256::FieldBytes::from(*node.private_key()))
        .map_err(|_| Error::InvalidKey)?;

    // k256 always produces low-S signatures with matching recovery ids
    let (sig, recid) = sk
        .sign_prehash_recoverable(prehash)
        .map_err(|_| Error::SignError)?;

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = recid.to_byte();

    Ok(out)
}

/// Convert `r || s || v` to the legacy `(27 + v) || r || s` form
pub fn to_legacy(sig: &[u8; 65]) -> [u8; 65] {
    let mut out = [0u8; 65];
    out[0] = LEGACY_V_OFFSET + sig[64];
    out[1..].copy_from_slice(&sig[..64]);
    out
}

/// Convert the legacy `(27 + v) || r || s` form to `r || s || v`
pub fn from_legacy(sig: &[u8; 65]) -> Result<[u8; 65], Error> {
    let v = sig[0]
        .checked_sub(LEGACY_V_OFFSET)
        .filter(|v| *v <= 3)
        .ok_or(Error::SignError)?;

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&sig[1..]);
    out[64] = v;
    Ok(out)
}

/// Compute the secret scalar for BIP-340 signing, applying the taproot
/// tweak where provided
fn schnorr_key(node: &KeyNode, tweak: Option<Tweak>) -> Result<k256::schnorr::SigningKey, Error> {
    let tweak = match tweak {
        Some(t) => t,
        None => {
            return k256::schnorr::SigningKey::from_bytes(node.private_key())
                .map_err(|_| Error::InvalidKey)
        }
    };

    let d: Option<k256::Scalar> =
        k256::Scalar::from_repr(k256::FieldBytes::from(*node.private_key())).into();
    let d = d.ok_or(Error::InvalidKey)?;

    // Internal key with even y
    let p = (k256::ProjectivePoint::GENERATOR * d).to_affine();
    let d = match bool::from(p.y_is_odd()) {
        true => -d,
        false => d,
    };
    let px: [u8; 32] = p.x().into();

    let t = match &tweak.merkle_root {
        Some(root) => tagged_hash("TapTweak", &[&px[..], &root[..]]),
        None => tagged_hash("TapTweak", &[&px[..]]),
    };
    let t: Option<k256::Scalar> = k256::Scalar::from_repr(t.into()).into();
    let t = t.ok_or(Error::SignError)?;

    let tweaked: [u8; 32] = (d + t).to_repr().into();
    k256::schnorr::SigningKey::from_bytes(&tweaked).map_err(|_| Error::InvalidKey)
}

/// BIP-340 x-only public key, tweaked for taproot key-path spends
pub fn schnorr_public_key(node: &KeyNode, tweak: Option<Tweak>) -> Result<[u8; 32], Error> {
    let sk = schnorr_key(node, tweak)?;
    Ok(sk.verifying_key().to_bytes().into())
}

/// BIP-340 schnorr signature over a message
pub fn sign_schnorr(
    node: &KeyNode,
    msg: &[u8],
    tweak: Option<Tweak>,
    aux: &[u8; 32],
) -> Result<[u8; 64], Error> {
    let sk = schnorr_key(node, tweak)?;
    let sig = sk.sign_raw(msg, aux).map_err(|_| Error::SignError)?;
    Ok(sig.to_bytes())
}

/// EdDSA signature over exactly the supplied bytes
pub fn sign_eddsa(node: &KeyNode, msg: &[u8]) -> Result<[u8; 64], Error> {
    match node.curve() {
        Curve::Ed25519 => {
            let sk = ed25519_dalek::SigningKey::from_bytes(node.private_key());
            Ok(sk.sign(msg).to_bytes())
        }
        Curve::Ed25519Keccak => {
            let esk = expand_keccak(node.private_key());
            let vk = ed25519_dalek::VerifyingKey::from(&esk);
            let sig = ed25519_dalek::hazmat::raw_sign::<Keccak512>(&esk, msg, &vk);
            Ok(sig.to_bytes())
        }
        _ => Err(Error::UnsupportedCurve),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keychain::{Keychain, HARDENED};
    use hwsign_apdu::app_info::CurveFlags;
    use k256::ecdsa::{signature::hazmat::PrehashVerifier, RecoveryId, VerifyingKey};

    const SEED: [u8; 16] = [0x11; 16];

    fn node(path: &[u32], curve: Curve) -> KeyNode {
        Keychain::new(&SEED, CurveFlags::all())
            .derive(path, curve)
            .unwrap()
    }

    #[test]
    fn ecdsa_recoverable() {
        let n = node(&[44 | HARDENED, 60 | HARDENED, HARDENED, 0, 0], Curve::Secp256k1);
        let digest = crate::helpers::keccak256(b"test message");

        let s = sign(&n, Scheme::EcdsaRecoverable, &digest, &[0u8; 32]).unwrap();
        assert_eq!(s.bytes.len(), 65);
        assert!(s.bytes[64] <= 1);

        let sig = k256::ecdsa::Signature::from_slice(&s.bytes[..64]).unwrap();
        // Already low-S
        assert!(sig.normalize_s().is_none());

        let recid = RecoveryId::from_byte(s.bytes[64]).unwrap();
        let vk = VerifyingKey::recover_from_prehash(&digest, &sig, recid).unwrap();
        assert_eq!(&vk.to_encoded_point(true).as_bytes()[..], n.public_key());
    }

    #[test]
    fn legacy_conversion() {
        let n = node(&[44 | HARDENED, 0], Curve::Secp256k1);
        let s = sign_recoverable(&n, &[0xab; 32]).unwrap();

        let l = to_legacy(&s);
        assert!(l[0] == 27 || l[0] == 28);
        assert_eq!(&l[1..], &s[..64]);
        assert_eq!(from_legacy(&l).unwrap(), s);

        let mut bad = l;
        bad[0] = 3;
        assert_eq!(from_legacy(&bad), Err(Error::SignError));
    }

    #[test]
    fn der_signature() {
        let n = node(&[44 | HARDENED, 0], Curve::Secp256k1);
        let s = sign(&n, Scheme::EcdsaDer, &[0x01; 32], &[0u8; 32]).unwrap();

        assert_eq!(s.bytes[0], 0x30);
        assert_eq!(s.bytes[1] as usize, s.bytes.len() - 2);

        // DER signature wraps the same r / s values
        let der = k256::ecdsa::Signature::from_der(&s.bytes).unwrap();
        let rs = sign_recoverable(&n, &[0x01; 32]).unwrap();
        assert_eq!(der.to_bytes().as_slice(), &rs[..64]);

        let vk = VerifyingKey::from_sec1_bytes(n.public_key()).unwrap();
        vk.verify_prehash(&[0x01; 32], &der).unwrap();
    }

    #[test]
    fn bip340_vector() {
        // BIP-340 test vector 0
        let mut k = [0u8; 32];
        k[31] = 3;
        let n = KeyNode::from_private_key(Curve::Secp256k1, &k).unwrap();

        let sig = sign_schnorr(&n, &[0u8; 32], None, &[0u8; 32]).unwrap();
        assert_eq!(
            hex::encode_upper(sig),
            "E907831F80848D1069A5371B402410364BDF1C5F8307B0084C55F1CE2DCA8215\
             25F66A4A85EA8B71E482A74F382D2CE5EBEEE8FDB2172F477DF4900D310536C0"
        );
        assert_eq!(
            hex::encode_upper(schnorr_public_key(&n, None).unwrap()),
            "F9308A019258C31049344F85F89D5229B531C845836F99B08601F113BCE036F9"
        );
    }

    #[test]
    fn taproot_tweak() {
        let n = node(&[86 | HARDENED, HARDENED, HARDENED, 0, 0], Curve::Secp256k1);
        let msg = [0x42; 32];

        let untweaked = schnorr_public_key(&n, None).unwrap();
        let tweak = Some(Tweak { merkle_root: None });
        let tweaked = schnorr_public_key(&n, tweak).unwrap();
        assert_ne!(untweaked, tweaked);

        let sig = sign_schnorr(&n, &msg, tweak, &[0x01; 32]).unwrap();

        let vk = k256::schnorr::VerifyingKey::from_bytes(&tweaked).unwrap();
        let sig = k256::schnorr::Signature::try_from(&sig[..]).unwrap();
        vk.verify_raw(&msg, &sig).unwrap();
    }

    #[test]
    fn eddsa_no_rehash() {
        use ed25519_dalek::Verifier;

        let n = node(&[44 | HARDENED, 501 | HARDENED], Curve::Ed25519);
        let msg = b"\xffsolana offchain arbitrary length input";

        let s = sign(&n, Scheme::Eddsa, msg, &[0u8; 32]).unwrap();
        assert_eq!(s.bytes.len(), 64);

        let pk: [u8; 32] = n.public_key().try_into().unwrap();
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&pk).unwrap();
        let sig = ed25519_dalek::Signature::from_slice(&s.bytes).unwrap();
        vk.verify(msg, &sig).unwrap();
    }

    #[test]
    fn ed25519_keccak_signs() {
        let n = node(&[44 | HARDENED, 43 | HARDENED], Curve::Ed25519Keccak);
        let a = sign_eddsa(&n, b"message").unwrap();
        let b = sign_eddsa(&n, b"message").unwrap();

        // Deterministic
        assert_eq!(a, b);
    }

    #[test]
    fn curve_mismatch() {
        let n = node(&[44 | HARDENED], Curve::Ed25519);
        assert_eq!(
            sign(&n, Scheme::EcdsaRecoverable, &[0u8; 32], &[0u8; 32]),
            Err(Error::UnsupportedCurve)
        );

        let n = node(&[44 | HARDENED], Curve::Nist256p1);
        let s = sign(&n, Scheme::P256, &[0x07; 32], &[0u8; 32]).unwrap();
        assert_eq!(s.bytes.len(), 64);
    }
}
