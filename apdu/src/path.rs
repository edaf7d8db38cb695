// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP-0032 style derivation paths and their wire encoding

use core::{fmt::Display, str::FromStr};

use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::{helpers::read_u32, ApduError};

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// Maximum path depth representable on the wire
///
/// Keychain derivation enforces a lower limit, see `hwsign_core::consts`.
pub const MAX_WIRE_DEPTH: usize = 16;

/// Derivation path, an ordered sequence of 32-bit indices where
/// hardened indices carry the [HARDENED] bit.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     DEPTH     |                    RESERVED                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           INDEX[0]                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                              ...                              /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       INDEX[DEPTH - 1]                        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath(Vec<u32, MAX_WIRE_DEPTH>);

impl DerivationPath {
    /// Create an empty (master) path
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a slice of indices
    pub fn from_slice(indices: &[u32]) -> Result<Self, ApduError> {
        Vec::from_slice(indices)
            .map(Self)
            .map_err(|_| ApduError::InvalidLength)
    }

    /// Append an index to the path
    pub fn push(&mut self, index: u32) -> Result<(), ApduError> {
        self.0.push(index).map_err(|_| ApduError::InvalidLength)
    }

    /// Path depth (number of indices)
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path indices
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// Check whether every index in the path is hardened
    pub fn is_fully_hardened(&self) -> bool {
        self.0.iter().all(|i| i & HARDENED != 0)
    }
}

impl AsRef<[u32]> for DerivationPath {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl Display for DerivationPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "m")?;
        for i in self.0.iter() {
            match i & HARDENED != 0 {
                true => write!(f, "/{}'", i & !HARDENED)?,
                false => write!(f, "/{}", i)?,
            }
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = ApduError;

    /// Parse a path in `m/44'/60'/0'/0/0` form, `h` is accepted as a hardened suffix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');

        if parts.next() != Some("m") {
            return Err(ApduError::InvalidEncoding);
        }

        let mut p = Self::new();
        for c in parts {
            let (v, hardened) = match c.strip_suffix('\'').or_else(|| c.strip_suffix('h')) {
                Some(v) => (v, true),
                None => (c, false),
            };

            let v = u32::from_str(v).map_err(|_| ApduError::InvalidEncoding)?;
            if v & HARDENED != 0 {
                return Err(ApduError::InvalidEncoding);
            }

            p.push(if hardened { v | HARDENED } else { v })?;
        }

        Ok(p)
    }
}

impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(4 + self.0.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        // Write depth and reserved bytes
        buff[0] = self.0.len() as u8;
        buff[1..4].fill(0);

        // Write indices
        let mut index = 4;
        for i in self.0.iter() {
            buff[index..][..4].copy_from_slice(&i.to_le_bytes());
            index += 4;
        }

        Ok(index)
    }
}

impl DecodeOwned for DerivationPath {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 4 {
            return Err(ApduError::InvalidLength);
        }

        let depth = buff[0] as usize;
        if depth > MAX_WIRE_DEPTH {
            return Err(ApduError::InvalidLength);
        }

        let mut p = Self::new();
        let mut index = 4;
        for _ in 0..depth {
            p.push(read_u32(buff, index)?)?;
            index += 4;
        }

        Ok((p, index))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode_apdu;

    #[test]
    fn path_display_parse() {
        let tests = &[
            ("m", &[][..]),
            ("m/44'/60'/0'/0/0", &[44 | HARDENED, 60 | HARDENED, HARDENED, 0, 0][..]),
            ("m/44'/501'/0'/0'", &[44 | HARDENED, 501 | HARDENED, HARDENED, HARDENED][..]),
        ];

        for (s, i) in tests {
            let p = DerivationPath::from_str(s).unwrap();
            assert_eq!(p.indices(), *i);

            let mut buff = [0u8; 64];
            let mut w = heapless::String::<64>::new();
            core::fmt::write(&mut w, format_args!("{p}")).unwrap();
            assert_eq!(w.as_str(), *s);

            encode_decode_apdu(&mut buff, &p);
        }
    }

    #[test]
    fn path_hardened_suffix() {
        let a = DerivationPath::from_str("m/84h/0h/0h/1/5").unwrap();
        let b = DerivationPath::from_str("m/84'/0'/0'/1/5").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn path_parse_errors() {
        assert!(DerivationPath::from_str("44'/0'").is_err());
        assert!(DerivationPath::from_str("m/x").is_err());
        assert!(DerivationPath::from_str("m/2147483648").is_err());
    }

    #[test]
    fn path_decode_too_deep() {
        let mut buff = [0u8; 128];
        buff[0] = MAX_WIRE_DEPTH as u8 + 1;
        assert_eq!(
            DerivationPath::decode_owned(&buff),
            Err(ApduError::InvalidLength)
        );
    }
}
