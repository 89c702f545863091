//! # Addresses
//!
//! A 20-byte identifier shared by every addressable thing in PiggyVault:
//! owner identities, deployed piggy banks, the factory itself, and the
//! assets a piggy bank accepts. The width and `0x`-hex rendering follow
//! the EVM account model, so addresses can be copied between PiggyVault
//! and a block explorer unchanged.
//!
//! Addresses serialize as lowercase `0x`-prefixed hex strings. That keeps
//! them usable as JSON map keys without a custom `with =` helper.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::crypto::hash::sha256;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Errors from parsing an address string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The string is not valid hexadecimal.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded bytes are not exactly [`ADDRESS_LENGTH`] long.
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Never produced by derivation in practice.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Takes the trailing 20 bytes of a 32-byte digest.
    ///
    /// This is how every derived address is cut down from its hash.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Mixed-case checksummed rendering.
    ///
    /// A hex letter is uppercased when the matching nibble of
    /// `SHA-256(lowercase_hex)` is 8 or above. Parsing is case-insensitive,
    /// so the checksum is advisory; [`Address::verify_checksum`] checks it.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = sha256(lower.as_bytes());
        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = digest[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Returns `true` if `s` is either all one case or exactly matches the
    /// checksummed rendering of the address it encodes.
    pub fn verify_checksum(s: &str) -> bool {
        let Ok(address) = s.parse::<Address>() else {
            return false;
        };
        let body = s.strip_prefix("0x").unwrap_or(s);
        let all_lower = !body.chars().any(|c| c.is_ascii_uppercase());
        let all_upper = !body.chars().any(|c| c.is_ascii_lowercase());
        all_lower || all_upper || address.to_checksum() == format!("0x{body}")
    }

    /// Parses a hex address with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
