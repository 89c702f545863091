//! # Cryptographic Primitives
//!
//! Thin wrappers over audited crates. Hashing lives in [`hash`]; Ed25519
//! key handling lives in [`crate::identity`].

pub mod hash;

pub use hash::{blake3_hash, domain_separated_hash, domain_separated_hash_multi, sha256};
