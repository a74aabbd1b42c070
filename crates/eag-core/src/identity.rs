//! Identity normalizer
//!
//! A device's identity is its hardware (MAC) address and nothing else. Both
//! registries hand us loosely typed identifier strings, sometimes mixed in
//! with IP addresses and vendor IDs, so the normalizer scans candidates in
//! order and keeps the first one that parses as a MAC address.
//!
//! Accepted encodings (any case):
//!
//! - `aa:bb:cc:dd:ee:ff` / `aa-bb-cc-dd-ee-ff` (1 or 2 hex digits per group)
//! - `aabb.ccdd.eeff`
//! - `aabbccddeeff`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Canonical hardware address used as the sole device-matching key
///
/// Displays as uppercase, colon-delimited, zero-padded hex
/// (`AA:BB:CC:DD:EE:FF`). Two keys are equal iff their canonical strings are
/// byte-equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey([u8; 6]);

impl IdentityKey {
    /// Parse a single identifier string
    ///
    /// Returns `None` for anything that is not a hardware address, including
    /// IPv4/IPv6 literals.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.parse::<IpAddr>().is_ok() {
            return None;
        }

        let separator = [':', '-', '.'].into_iter().find(|sep| raw.contains(*sep));
        let groups: Vec<&str> = match separator {
            Some(sep) => raw.split(sep).collect(),
            None => vec![raw],
        };

        // Mixed separators end up inside a group and fail the hex check
        let digits = match (separator, groups.len()) {
            (Some(':' | '-'), 6) if groups.iter().all(|g| (1..=2).contains(&g.len())) => groups
                .iter()
                .map(|g| format!("{:0>2}", g))
                .collect::<String>(),
            (Some('.'), 3) if groups.iter().all(|g| g.len() == 4) => groups.concat(),
            (None, 1) if raw.len() == 12 => raw.to_string(),
            _ => return None,
        };

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(octets))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for IdentityKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::invalid_input(format!("not a hardware address: {s}")))
    }
}

impl Serialize for IdentityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdentityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Derive the identity key from an ordered list of identifier candidates
///
/// # Parameters
///
/// - `candidates`: identifier strings in source order
///
/// # Returns
///
/// - `Some(IdentityKey)`: the first candidate that is a hardware address
/// - `None`: no candidate qualifies
pub fn normalize<I, S>(candidates: I) -> Option<IdentityKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .find_map(|candidate| IdentityKey::parse(candidate.as_ref()))
}

/// Like [`normalize`], but fails with [`Error::NoValidIdentifier`] naming the
/// record so the caller can report it.
pub fn normalize_named<I, S>(name: &str, candidates: I) -> Result<IdentityKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize(candidates).ok_or_else(|| Error::no_valid_identifier(name))
}
