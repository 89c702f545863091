//! Integration tests for identities, addresses and vault-address derivation.
//!
//! These check that the primitives compose: a keypair yields an owner
//! address, the owner address round-trips through its textual forms, and
//! derivation from that owner is stable and parameter-sensitive.

use std::collections::HashSet;

use piggy_protocol::config::{PenaltyModel, PenaltySink, PiggyConfig, USDC_ADDRESS};
use piggy_protocol::derivation::{
    create2_address, derive_factory_address, derive_vault_address, vault_code_hash, vault_salt,
};
use piggy_protocol::{Address, AddressError, PiggyKeypair};

const THIRTY_DAYS: u64 = 30 * 86_400;

// ---------------------------------------------------------------------------
// Identity -> Address
// ---------------------------------------------------------------------------

#[test]
fn keypair_address_round_trips_through_text() {
    let owner = PiggyKeypair::from_seed(&[3u8; 32]).address();

    let hex = owner.to_hex();
    let checksum = owner.to_checksum();
    assert_eq!(hex.len(), 42);
    assert_eq!(hex, checksum.to_lowercase());
    assert!(Address::verify_checksum(&checksum));

    assert_eq!(Address::from_hex(&hex).unwrap(), owner);
    assert_eq!(checksum.parse::<Address>().unwrap(), owner);
}

#[test]
fn restored_keypair_owns_the_same_address() -> anyhow::Result<()> {
    let original = PiggyKeypair::generate();
    let restored = PiggyKeypair::from_hex(&hex::encode(original.secret_key_bytes()))?;
    assert_eq!(original.address(), restored.address());
    Ok(())
}

#[test]
fn malformed_addresses_are_rejected() {
    assert!(matches!(
        Address::from_hex("0xnothex"),
        Err(AddressError::InvalidHex(_))
    ));
    assert_eq!(
        Address::from_hex("0x0102"),
        Err(AddressError::InvalidLength(2))
    );
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

#[test]
fn derivation_is_the_create2_composition() {
    let factory = derive_factory_address(&Address::from_bytes([0xDE; 20]), 0);
    let owner = PiggyKeypair::from_seed(&[5u8; 32]).address();

    let composed = create2_address(
        &factory,
        &vault_salt(&owner, THIRTY_DAYS, "Vacation Fund"),
        &vault_code_hash(),
    );
    assert_eq!(
        derive_vault_address(&factory, &owner, THIRTY_DAYS, "Vacation Fund"),
        composed
    );
}

#[test]
fn many_owners_never_collide() {
    let factory = Address::from_bytes([0xF0; 20]);
    let addresses: HashSet<Address> = (0u8..=200)
        .map(|seed| {
            let owner = PiggyKeypair::from_seed(&[seed; 32]).address();
            derive_vault_address(&factory, &owner, THIRTY_DAYS, "Vacation Fund")
        })
        .collect();
    assert_eq!(addresses.len(), 201);
}

#[test]
fn salt_depends_on_every_field() {
    let owner = Address::from_bytes([0x0A; 20]);
    assert_ne!(
        vault_salt(&owner, THIRTY_DAYS, "ab"),
        vault_salt(&owner, THIRTY_DAYS, "a")
    );
    assert_ne!(
        vault_salt(&owner, 0, ""),
        vault_salt(&Address::ZERO, 0, "")
    );
    assert_ne!(
        vault_salt(&owner, THIRTY_DAYS, ""),
        vault_salt(&owner, THIRTY_DAYS + 1, "")
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn config_file_overrides_selected_fields() -> anyhow::Result<()> {
    let treasury = Address::from_bytes([0x7E; 20]);
    let json = format!(
        r#"{{
            "penalty": {{ "kind": "fixed", "bps": 500 }},
            "penalty_sink": {{ "kind": "treasury", "address": "{}" }}
        }}"#,
        treasury.to_checksum()
    );
    let config = PiggyConfig::from_json_str(&json)?;
    assert_eq!(config.penalty, PenaltyModel::Fixed { bps: 500 });
    assert_eq!(config.penalty_sink, PenaltySink::Treasury { address: treasury });
    assert_eq!(config.max_lock_secs, PiggyConfig::default().max_lock_secs);
    assert!(config
        .accepted_assets
        .iter()
        .any(|a| a.address == USDC_ADDRESS && a.format_amount(1_500_000) == "1.5 USDC"));
    Ok(())
}

#[test]
fn config_rejects_nonsense() {
    assert!(PiggyConfig::from_json_str(r#"{"accepted_assets": []}"#).is_err());
    assert!(PiggyConfig::from_json_str(r#"{"penalty": {"kind": "linear", "max_bps": 10001}}"#).is_err());
    assert!(PiggyConfig::from_json_str("not json").is_err());
}
