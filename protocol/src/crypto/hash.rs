//! # Hashing Utilities
//!
//! Two hash functions, each with one job:
//!
//! - **BLAKE3** drives everything that has to be deterministic inside
//!   PiggyVault: identity addresses, vault salts, and the final vault
//!   address. Every use goes through [`domain_separated_hash`] so that a
//!   salt can never be confused with an address preimage.
//! - **SHA-256** is only used for the mixed-case checksum rendering of
//!   addresses (see [`crate::address::Address::to_checksum`]).

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `data` as a fixed-size array.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Compute the plain BLAKE3 digest of `data`.
///
/// ```
/// use piggy_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"piggy");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 in `derive_key` mode, keyed by a context string.
///
/// Two different contexts never collide on the same input. The context
/// strings used by the protocol live in [`crate::config`].
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Domain-separated BLAKE3 over several parts fed in sequence.
///
/// Equivalent to [`domain_separated_hash`] over the concatenation of
/// `parts`, without building the concatenated buffer.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
