// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Keychain and hierarchical key derivation
//!
//! Keys are derived on demand from the session seed using SLIP-0010 for
//! every supported curve. Derived [`KeyNode`]s are copies, private key
//! material is zeroized on drop.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak512};
use strum::{Display, EnumIter, EnumString};
use zeroize::{Zeroize, ZeroizeOnDrop};

use hwsign_apdu::app_info::CurveFlags;
pub use hwsign_apdu::path::HARDENED;

use crate::{consts::MAX_DERIVATION_DEPTH, engine::Error, helpers::hash160};

mod slip10;

/// Supported curves
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum Curve {
    #[strum(serialize = "secp256k1")]
    Secp256k1,
    #[strum(serialize = "nist256p1")]
    Nist256p1,
    #[strum(serialize = "ed25519")]
    Ed25519,
    #[strum(serialize = "ed25519-keccak")]
    Ed25519Keccak,
}

impl Curve {
    /// SLIP-0010 master key HMAC key
    pub const fn seed_key(&self) -> &'static [u8] {
        match self {
            Curve::Secp256k1 => b"Bitcoin seed",
            Curve::Nist256p1 => b"Nist256p1 seed",
            Curve::Ed25519 => b"ed25519 seed",
            Curve::Ed25519Keccak => b"ed25519-keccak seed",
        }
    }

    /// Flag advertising this curve
    pub const fn flag(&self) -> CurveFlags {
        match self {
            Curve::Secp256k1 => CurveFlags::SECP256K1,
            Curve::Nist256p1 => CurveFlags::NIST256P1,
            Curve::Ed25519 => CurveFlags::ED25519,
            Curve::Ed25519Keccak => CurveFlags::ED25519_KECCAK,
        }
    }

    /// Whether non-hardened (public) derivation is defined
    pub const fn supports_public_derivation(&self) -> bool {
        matches!(self, Curve::Secp256k1 | Curve::Nist256p1)
    }

    /// Whether public keys carry the 0x01 ed25519 tag
    pub const fn is_ed25519(&self) -> bool {
        matches!(self, Curve::Ed25519 | Curve::Ed25519Keccak)
    }
}

/// Derived key node
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyNode {
    #[zeroize(skip)]
    curve: Curve,
    depth: u8,
    child_index: u32,
    parent_fingerprint: u32,
    chain_code: [u8; 32],
    private_key: [u8; 32],
    /// Compressed SEC1 for weierstrass curves, `0x01 || A` for ed25519
    public_key: [u8; 33],
}

impl core::fmt::Debug for KeyNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyNode")
            .field("curve", &self.curve)
            .field("depth", &self.depth)
            .field("child_index", &self.child_index)
            .field("public_key", &self.public_key())
            .finish()
    }
}

impl KeyNode {
    fn new(
        curve: Curve,
        depth: u8,
        child_index: u32,
        parent_fingerprint: u32,
        ext: &slip10::Extended,
    ) -> Result<Self, Error> {
        Ok(Self {
            curve,
            depth,
            child_index,
            parent_fingerprint,
            chain_code: ext.chain_code,
            private_key: ext.key,
            public_key: public_key_for(curve, &ext.key)?,
        })
    }

    /// Create a root node from a raw private key
    pub(crate) fn from_private_key(curve: Curve, key: &[u8; 32]) -> Result<Self, Error> {
        let ext = slip10::Extended {
            key: *key,
            chain_code: [0u8; 32],
        };
        Self::new(curve, 0, 0, 0, &ext)
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_index(&self) -> u32 {
        self.child_index
    }

    pub fn parent_fingerprint(&self) -> u32 {
        self.parent_fingerprint
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    /// Private key bytes, callers must not retain copies
    pub(crate) fn private_key(&self) -> &[u8; 32] {
        &self.private_key
    }

    /// Public key bytes, with the ed25519 tag byte stripped
    pub fn public_key(&self) -> &[u8] {
        match self.curve.is_ed25519() {
            true => &self.public_key[1..],
            false => &self.public_key[..],
        }
    }

    /// BIP-0032 fingerprint of this node
    pub fn fingerprint(&self) -> u32 {
        let h = hash160(&self.public_key);
        u32::from_be_bytes([h[0], h[1], h[2], h[3]])
    }
}

/// Compute the public key for a private key on the provided curve
fn public_key_for(curve: Curve, private_key: &[u8; 32]) -> Result<[u8; 33], Error> {
    let mut pk = [0u8; 33];

    match curve {
        Curve::Secp256k1 => {
            let sk = k256::SecretKey::from_bytes(&k256::FieldBytes::from(*private_key))
                .map_err(|_| Error::InvalidKey)?;
            pk.copy_from_slice(sk.public_key().to_encoded_point(true).as_bytes());
        }
        Curve::Nist256p1 => {
            let sk = p256::SecretKey::from_bytes(&p256::FieldBytes::from(*private_key))
                .map_err(|_| Error::InvalidKey)?;
            pk.copy_from_slice(sk.public_key().to_encoded_point(true).as_bytes());
        }
        Curve::Ed25519 => {
            let sk = ed25519_dalek::SigningKey::from_bytes(private_key);
            pk[0] = 0x01;
            pk[1..].copy_from_slice(sk.verifying_key().as_bytes());
        }
        Curve::Ed25519Keccak => {
            let esk = expand_keccak(private_key);
            let vk = ed25519_dalek::VerifyingKey::from(&esk);
            pk[0] = 0x01;
            pk[1..].copy_from_slice(vk.as_bytes());
        }
    }

    Ok(pk)
}

/// Expand an ed25519 secret using Keccak-512 in place of SHA-512
pub(crate) fn expand_keccak(private_key: &[u8; 32]) -> ed25519_dalek::hazmat::ExpandedSecretKey {
    let mut h: [u8; 64] = Keccak512::digest(private_key).into();
    let esk = ed25519_dalek::hazmat::ExpandedSecretKey::from_bytes(&h);
    h.zeroize();
    esk
}

/// Keychain over a session seed, restricted to the advertised curves
pub struct Keychain<'a> {
    seed: &'a [u8],
    curves: CurveFlags,
}

impl<'a> Keychain<'a> {
    pub fn new(seed: &'a [u8], curves: CurveFlags) -> Self {
        Self { seed, curves }
    }

    /// Curves available for derivation
    pub fn curves(&self) -> CurveFlags {
        self.curves
    }

    /// Derive the key node for a path on the provided curve
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn derive(&self, path: &[u32], curve: Curve) -> Result<KeyNode, Error> {
        if !self.curves.contains(curve.flag()) {
            return Err(Error::UnsupportedCurve);
        }
        if path.len() > MAX_DERIVATION_DEPTH {
            return Err(Error::PathTooDeep);
        }
        if !curve.supports_public_derivation() && path.iter().any(|i| i & HARDENED == 0) {
            return Err(Error::InvalidPathForCurve);
        }

        let ext = slip10::master(curve, self.seed)?;
        let mut node = KeyNode::new(curve, 0, 0, 0, &ext)?;
        drop(ext);

        for index in path {
            let ext = slip10::child(curve, &node.extended(), &node.public_key, *index)?;
            node = KeyNode::new(curve, node.depth + 1, *index, node.fingerprint(), &ext)?;
        }

        Ok(node)
    }

    /// Fingerprint of the secp256k1 master node, identifying the wallet
    pub fn root_fingerprint(&self) -> Result<u32, Error> {
        let ext = slip10::master(Curve::Secp256k1, self.seed)?;
        let node = KeyNode::new(Curve::Secp256k1, 0, 0, 0, &ext)?;
        Ok(node.fingerprint())
    }
}

impl KeyNode {
    fn extended(&self) -> slip10::Extended {
        slip10::Extended {
            key: self.private_key,
            chain_code: self.chain_code,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn keychain(seed: &[u8]) -> Keychain {
        Keychain::new(seed, CurveFlags::all())
    }

    #[test]
    fn secp256k1_vectors() {
        let seed = hex::decode(SEED).unwrap();
        let k = keychain(&seed);

        let tests: &[(&[u32], &str, &str, &str)] = &[
            (
                &[],
                "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508",
                "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35",
                "0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2",
            ),
            (
                &[HARDENED],
                "47fdacbd0f1097043b78c63c20c34ef4ed9a111d980047ad16282c7ae6236141",
                "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea",
                "035a784662a4a20a65bf6aab9ae98a6c068a81c52e4b032c0fb5400c706cfccc56",
            ),
            (
                &[HARDENED, 1],
                "2a7857631386ba23dacac34180dd1983734e444fdbf774041578e9b6adb37c19",
                "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368",
                "03501e454bf00751f24b1b489aa925215d66af2234e3891c3b21a52bedb3cd711c",
            ),
        ];

        for (path, chain_code, private_key, public_key) in tests {
            let n = k.derive(path, Curve::Secp256k1).unwrap();

            assert_eq!(hex::encode(n.chain_code()), *chain_code);
            assert_eq!(hex::encode(n.private_key()), *private_key);
            assert_eq!(hex::encode(n.public_key()), *public_key);
            assert_eq!(n.depth() as usize, path.len());
        }

        assert_eq!(k.root_fingerprint().unwrap(), 0x3442193e);

        let n = k.derive(&[HARDENED], Curve::Secp256k1).unwrap();
        assert_eq!(n.parent_fingerprint(), 0x3442193e);
    }

    #[test]
    fn ed25519_vectors() {
        let seed = hex::decode(SEED).unwrap();
        let k = keychain(&seed);

        let tests: &[(&[u32], &str, &str, &str)] = &[
            (
                &[],
                "90046a93de5380a72b5e45010748567d5ea02bbf6522f979e05c0d8d8ca9fffb",
                "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7",
                "a4b2856bfec510abab89753fac1ac0e1112364e7d250545963f135f2a33188ed",
            ),
            (
                &[HARDENED],
                "8b59aa11380b624e81507a27fedda59fea6d0b779a778918a2fd3590e16e9c69",
                "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3",
                "8c8a13df77a28f3445213a0f432fde644acaa215fc72dcdf300d5efaa85d350c",
            ),
        ];

        for (path, chain_code, private_key, public_key) in tests {
            let n = k.derive(path, Curve::Ed25519).unwrap();

            assert_eq!(hex::encode(n.chain_code()), *chain_code);
            assert_eq!(hex::encode(n.private_key()), *private_key);
            assert_eq!(hex::encode(n.public_key()), *public_key);
        }
    }

    #[test]
    fn derive_errors() {
        let seed = hex::decode(SEED).unwrap();
        let k = keychain(&seed);

        // ed25519 requires hardened derivation
        assert_eq!(
            k.derive(&[HARDENED | 44, 0], Curve::Ed25519).unwrap_err(),
            Error::InvalidPathForCurve
        );
        assert_eq!(
            k.derive(&[HARDENED | 44, 0], Curve::Ed25519Keccak)
                .unwrap_err(),
            Error::InvalidPathForCurve
        );

        // Depth limit
        let deep = [HARDENED; MAX_DERIVATION_DEPTH + 1];
        assert_eq!(
            k.derive(&deep, Curve::Secp256k1).unwrap_err(),
            Error::PathTooDeep
        );
        assert!(k
            .derive(&deep[..MAX_DERIVATION_DEPTH], Curve::Secp256k1)
            .is_ok());

        // Curves not advertised
        let k = Keychain::new(&seed, CurveFlags::SECP256K1);
        assert_eq!(
            k.derive(&[HARDENED], Curve::Ed25519).unwrap_err(),
            Error::UnsupportedCurve
        );
    }

    #[test]
    fn ed25519_keccak_differs() {
        let seed = hex::decode(SEED).unwrap();
        let k = keychain(&seed);

        let a = k.derive(&[HARDENED | 44, HARDENED | 43], Curve::Ed25519).unwrap();
        let b = k
            .derive(&[HARDENED | 44, HARDENED | 43], Curve::Ed25519Keccak)
            .unwrap();

        assert_eq!(a.public_key().len(), 32);
        assert_eq!(b.public_key().len(), 32);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn nist256p1_derive() {
        let seed = hex::decode(SEED).unwrap();
        let k = keychain(&seed);

        // SLIP-0010 test vector 1 for nist256p1, chain m
        let n = k.derive(&[], Curve::Nist256p1).unwrap();
        assert_eq!(
            hex::encode(n.private_key()),
            "612091aaa12e22dd2abef664f8a01a82cae99ad7441b7ef8110424915c268bc2"
        );
        assert_eq!(
            hex::encode(n.public_key()),
            "0266874dc6ade47b3ecd096745ca09bcd29638dd52c2c12117b11ed3e458cfa9e8"
        );

        // Non-hardened derivation is supported
        let n = k.derive(&[HARDENED, 1], Curve::Nist256p1).unwrap();
        assert_eq!(n.public_key().len(), 33);
    }
}
