//! # Deterministic Address Derivation
//!
//! A piggy bank's address is known before the piggy bank exists. The
//! construction follows CREATE2, with domain-separated BLAKE3 in place of
//! Keccak:
//!
//! ```text
//! salt      = H_salt(owner || lock_be64 || len_be32(purpose) || purpose)
//! code_hash = H_code(VAULT_CODE_TAG)
//! address   = last20(H_addr(0xff || factory || salt || code_hash))
//! ```
//!
//! The purpose label is length-prefixed so `("ab", "c")`-style boundary
//! shifts between fields cannot produce the same preimage. Nothing here
//! reads the clock or any counter, so the same inputs always yield the
//! same address.

use crate::address::Address;
use crate::config::{
    ADDRESS_CONTEXT, CODE_CONTEXT, CREATE2_PREFIX, SALT_CONTEXT, VAULT_CODE_TAG,
};
use crate::crypto::hash::{domain_separated_hash, domain_separated_hash_multi};

/// Context for factory addresses derived from `(deployer, nonce)`.
const FACTORY_CONTEXT: &str = "PiggyVault 2026-01-01 factory address v1";

/// Salt binding a vault to its owner and immutable parameters.
pub fn vault_salt(owner: &Address, lock_duration_secs: u64, purpose: &str) -> [u8; 32] {
    let purpose_len = u32::try_from(purpose.len()).unwrap_or(u32::MAX);
    domain_separated_hash_multi(
        SALT_CONTEXT,
        &[
            owner.as_bytes(),
            &lock_duration_secs.to_be_bytes(),
            &purpose_len.to_be_bytes(),
            purpose.as_bytes(),
        ],
    )
}

/// Hash of the vault "code". Constant for a given protocol version.
pub fn vault_code_hash() -> [u8; 32] {
    domain_separated_hash(CODE_CONTEXT, VAULT_CODE_TAG)
}

/// The address `factory` will deploy a salted vault to.
pub fn create2_address(factory: &Address, salt: &[u8; 32], code_hash: &[u8; 32]) -> Address {
    let digest = domain_separated_hash_multi(
        ADDRESS_CONTEXT,
        &[&[CREATE2_PREFIX], factory.as_bytes(), salt, code_hash],
    );
    Address::from_digest(&digest)
}

/// Full derivation from creation parameters to vault address.
///
/// ```
/// use piggy_protocol::address::Address;
/// use piggy_protocol::derivation::derive_vault_address;
///
/// let factory = Address::from_bytes([1; 20]);
/// let owner = Address::from_bytes([2; 20]);
/// let a = derive_vault_address(&factory, &owner, 2_592_000, "Vacation Fund");
/// let b = derive_vault_address(&factory, &owner, 2_592_000, "Vacation Fund");
/// assert_eq!(a, b);
/// ```
pub fn derive_vault_address(
    factory: &Address,
    owner: &Address,
    lock_duration_secs: u64,
    purpose: &str,
) -> Address {
    let salt = vault_salt(owner, lock_duration_secs, purpose);
    create2_address(factory, &salt, &vault_code_hash())
}

/// Address of a factory deployed by `deployer` as its `nonce`-th deployment.
pub fn derive_factory_address(deployer: &Address, nonce: u64) -> Address {
    let digest =
        domain_separated_hash_multi(FACTORY_CONTEXT, &[deployer.as_bytes(), &nonce.to_be_bytes()]);
    Address::from_digest(&digest)
}
