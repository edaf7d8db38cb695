// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Derivation path policy
//!
//! Chains declare the paths they accept as schema strings, for example
//! `m/44'/60'/[0-100]'/0/[0-1000000]`. Each component is one of:
//!
//! - a literal index (`44`)
//! - an inclusive range (`[0-100]`)
//! - a wildcard (`*`)
//!
//! optionally followed by `'` (or `h`) to mark a hardened component.

use heapless::Vec;

use crate::{
    consts::{MAX_DERIVATION_DEPTH, PERMISSIVE_MIN_DEPTH},
    engine::Error,
    keychain::HARDENED,
};

/// Schema component value matcher
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Matcher {
    Literal(u32),
    Range(u32, u32),
    Any,
}

/// Single schema component
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Component {
    pub matcher: Matcher,
    pub hardened: bool,
}

impl Component {
    /// Check whether a path index matches this component
    pub fn matches(&self, index: u32) -> bool {
        if (index & HARDENED != 0) != self.hardened {
            return false;
        }

        let v = index & !HARDENED;
        match self.matcher {
            Matcher::Literal(l) => v == l,
            Matcher::Range(a, b) => (a..=b).contains(&v),
            Matcher::Any => true,
        }
    }
}

/// Parsed path schema
#[derive(Clone, PartialEq, Debug)]
pub struct PathSchema(Vec<Component, MAX_DERIVATION_DEPTH>);

impl PathSchema {
    /// Parse a schema string
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut parts = s.split('/');

        if parts.next() != Some("m") {
            return Err(Error::InvalidPath);
        }

        let mut v = Vec::new();
        for p in parts {
            let (p, hardened) = match p.strip_suffix(['\'', 'h']) {
                Some(p) => (p, true),
                None => (p, false),
            };

            let matcher = if p == "*" {
                Matcher::Any
            } else if let Some(r) = p.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
                let (a, b) = r.split_once('-').ok_or(Error::InvalidPath)?;
                let a = a.parse::<u32>().map_err(|_| Error::InvalidPath)?;
                let b = b.parse::<u32>().map_err(|_| Error::InvalidPath)?;
                if a > b {
                    return Err(Error::InvalidPath);
                }
                Matcher::Range(a, b)
            } else {
                Matcher::Literal(p.parse::<u32>().map_err(|_| Error::InvalidPath)?)
            };

            v.push(Component { matcher, hardened })
                .map_err(|_| Error::PathTooDeep)?;
        }

        Ok(Self(v))
    }

    /// Check whether a path matches this schema
    pub fn matches(&self, path: &[u32]) -> bool {
        self.0.len() == path.len() && self.0.iter().zip(path).all(|(c, i)| c.matches(*i))
    }

    /// Schema components
    pub fn components(&self) -> &[Component] {
        &self.0
    }
}

/// Outcome of a successful path validation
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum PathCheck {
    /// Path matches a chain schema
    Standard,
    /// Path accepted by permissive validation only, the user must be warned
    NonStandard,
}

/// Validate a path against a set of schemas
///
/// With `strict` unset any path of depth >= [`PERMISSIVE_MIN_DEPTH`]
/// is accepted as [`PathCheck::NonStandard`].
pub fn validate(path: &[u32], schemas: &[&str], strict: bool) -> Result<PathCheck, Error> {
    if path.len() > MAX_DERIVATION_DEPTH {
        return Err(Error::PathTooDeep);
    }

    for s in schemas {
        let schema = PathSchema::parse(s)?;
        if schema.matches(path) {
            return Ok(PathCheck::Standard);
        }
    }

    match strict {
        false if path.len() >= PERMISSIVE_MIN_DEPTH => {
            #[cfg(feature = "log")]
            log::warn!("accepting non-standard path (depth {})", path.len());

            Ok(PathCheck::NonStandard)
        }
        _ => Err(Error::InvalidPath),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const H: u32 = HARDENED;
    const ETH: &[&str] = &["m/44'/60'/[0-100]'/0/[0-1000000]"];

    #[test]
    fn parse_schema() {
        let s = PathSchema::parse("m/44'/60'/[0-100]'/0/*").unwrap();

        assert_eq!(
            s.components(),
            &[
                Component {
                    matcher: Matcher::Literal(44),
                    hardened: true
                },
                Component {
                    matcher: Matcher::Literal(60),
                    hardened: true
                },
                Component {
                    matcher: Matcher::Range(0, 100),
                    hardened: true
                },
                Component {
                    matcher: Matcher::Literal(0),
                    hardened: false
                },
                Component {
                    matcher: Matcher::Any,
                    hardened: false
                },
            ]
        );

        assert!(PathSchema::parse("44'/0").is_err());
        assert!(PathSchema::parse("m/[5-1]").is_err());
        assert!(PathSchema::parse("m/abc").is_err());
    }

    #[test]
    fn validate_strict() {
        let ok = [44 | H, 60 | H, 0 | H, 0, 0];
        assert_eq!(validate(&ok, ETH, true), Ok(PathCheck::Standard));

        // Account out of range
        let bad = [44 | H, 60 | H, 101 | H, 0, 0];
        assert_eq!(validate(&bad, ETH, true), Err(Error::InvalidPath));

        // Hardness mismatch
        let bad = [44 | H, 60 | H, 0 | H, 0 | H, 0];
        assert_eq!(validate(&bad, ETH, true), Err(Error::InvalidPath));

        // Wrong depth
        assert_eq!(validate(&ok[..4], ETH, true), Err(Error::InvalidPath));
    }

    #[test]
    fn validate_permissive() {
        let p = [44 | H, 1 | H, 7 | H];
        assert_eq!(validate(&p, ETH, false), Ok(PathCheck::NonStandard));

        // Too shallow even for permissive validation
        assert_eq!(validate(&p[..2], ETH, false), Err(Error::InvalidPath));

        let deep = [H; MAX_DERIVATION_DEPTH + 1];
        assert_eq!(validate(&deep, ETH, false), Err(Error::PathTooDeep));
    }
}
