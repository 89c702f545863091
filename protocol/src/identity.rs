//! # Identities
//!
//! An owner identity in PiggyVault is an [`Address`]. Most callers will
//! already have one (it came from some external account system), but for
//! local use and tests an identity can be minted from an Ed25519 key:
//! the address is the trailing 20 bytes of a domain-separated BLAKE3 hash
//! of the 32-byte verifying key.
//!
//! Key bytes are never logged.

use ed25519_dalek::{SigningKey, VerifyingKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use crate::address::Address;
use crate::config::IDENTITY_CONTEXT;
use crate::crypto::hash::domain_separated_hash;

/// Errors from loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The secret key is not valid hex or not 32 bytes.
    #[error("invalid secret key bytes")]
    InvalidSecretKey,
}

/// Derives the identity address for an Ed25519 verifying key.
pub fn address_for_key(key: &VerifyingKey) -> Address {
    Address::from_digest(&domain_separated_hash(IDENTITY_CONTEXT, key.as_bytes()))
}

/// An Ed25519 keypair that owns an identity address.
///
/// Not `Serialize`; export the secret with
/// [`PiggyKeypair::secret_key_bytes`].
pub struct PiggyKeypair {
    signing_key: SigningKey,
}

impl PiggyKeypair {
    /// Generates a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuilds a keypair from a 32-byte seed. Deterministic.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Rebuilds a keypair from a hex-encoded 32-byte secret.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The public half.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The identity address owned by this keypair.
    pub fn address(&self) -> Address {
        address_for_key(&self.verifying_key())
    }

    /// Exports the raw secret. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for PiggyKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PiggyKeypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
