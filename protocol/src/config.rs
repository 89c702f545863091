//! # Protocol Configuration & Constants
//!
//! Every magic number in PiggyVault lives here, along with [`PiggyConfig`],
//! the runtime configuration a factory is built with.
//!
//! The domain-separation contexts below feed directly into address
//! derivation. Changing any of them changes every predicted address, so
//! treat them as part of the wire format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::asset::AssetInfo;

// ---------------------------------------------------------------------------
// Derivation Contexts
// ---------------------------------------------------------------------------

/// BLAKE3 `derive_key` context for identity addresses derived from keys.
pub const IDENTITY_CONTEXT: &str = "PiggyVault 2026-01-01 identity address v1";

/// Context for the per-vault salt over `(owner, lock, purpose)`.
pub const SALT_CONTEXT: &str = "PiggyVault 2026-01-01 vault salt v1";

/// Context for the vault code hash.
pub const CODE_CONTEXT: &str = "PiggyVault 2026-01-01 vault code v1";

/// Context for the final `(factory, salt, code)` address hash.
pub const ADDRESS_CONTEXT: &str = "PiggyVault 2026-01-01 vault address v1";

/// Tag standing in for the vault's init code. Bump the version suffix
/// whenever `PiggyBank` semantics change so old and new vaults can
/// never share an address.
pub const VAULT_CODE_TAG: &[u8] = b"PiggyBank/v1";

/// Leading byte of the address preimage, as in CREATE2.
pub const CREATE2_PREFIX: u8 = 0xff;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum purpose label length in bytes.
pub const MAX_PURPOSE_LENGTH: usize = 256;

/// Basis-point denominator. 10_000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default emergency-withdrawal penalty: 15%.
pub const DEFAULT_PENALTY_BPS: u16 = 1_500;

/// Seconds in a day. Lock durations are stored in seconds.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default upper bound on a lock: 100 years.
pub const DEFAULT_MAX_LOCK_SECS: u64 = 100 * 365 * SECONDS_PER_DAY;

/// Hard ceiling on any configured lock: 1000 years. Keeps
/// `created_at + lock` well inside chrono's representable range.
pub const MAX_SUPPORTED_LOCK_SECS: u64 = 1_000 * 365 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Well-known Assets
// ---------------------------------------------------------------------------

/// Tether USD.
pub const USDT_ADDRESS: Address = Address::from_bytes([
    0xda, 0xc1, 0x7f, 0x95, 0x8d, 0x2e, 0xe5, 0x23, 0xa2, 0x20, 0x62, 0x06, 0x99, 0x45, 0x97,
    0xc1, 0x3d, 0x83, 0x1e, 0xc7,
]);

/// USD Coin.
pub const USDC_ADDRESS: Address = Address::from_bytes([
    0xa0, 0xb8, 0x69, 0x91, 0xc6, 0x21, 0x8b, 0x36, 0xc1, 0xd1, 0x9d, 0x4a, 0x2e, 0x9e, 0xb0,
    0xce, 0x36, 0x06, 0xeb, 0x48,
]);

/// Dai.
pub const DAI_ADDRESS: Address = Address::from_bytes([
    0x6b, 0x17, 0x54, 0x74, 0xe8, 0x90, 0x94, 0xc4, 0x4d, 0xa9, 0x8b, 0x95, 0x4e, 0xed, 0xea,
    0xc4, 0x95, 0x27, 0x1d, 0x0f,
]);

/// The stablecoins a piggy bank accepts out of the box.
pub fn default_accepted_assets() -> Vec<AssetInfo> {
    vec![
        AssetInfo::new(USDT_ADDRESS, "USDT", 6),
        AssetInfo::new(USDC_ADDRESS, "USDC", 6),
        AssetInfo::new(DAI_ADDRESS, "DAI", 18),
    ]
}

// ---------------------------------------------------------------------------
// Penalty Policy
// ---------------------------------------------------------------------------

/// How much of each balance an early emergency withdrawal forfeits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltyModel {
    /// A flat fraction of the balance, in basis points.
    Fixed { bps: u16 },
    /// Scales with the unexpired fraction of the lock: `max_bps` right
    /// after creation, approaching zero as the unlock time nears.
    Linear { max_bps: u16 },
}

impl PenaltyModel {
    /// The largest fraction this model can ever charge, in bps.
    pub fn max_bps(&self) -> u16 {
        match self {
            PenaltyModel::Fixed { bps } => *bps,
            PenaltyModel::Linear { max_bps } => *max_bps,
        }
    }
}

impl Default for PenaltyModel {
    fn default() -> Self {
        PenaltyModel::Fixed {
            bps: DEFAULT_PENALTY_BPS,
        }
    }
}

/// Where forfeited penalties go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltySink {
    /// Credited to a treasury address.
    Treasury { address: Address },
    /// Destroyed. Nobody receives it.
    #[default]
    Burn,
}

// ---------------------------------------------------------------------------
// PiggyConfig
// ---------------------------------------------------------------------------

/// Configuration validation and parsing errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A penalty above 100% was configured.
    #[error("penalty of {0} bps exceeds {BPS_DENOMINATOR} bps")]
    PenaltyOutOfRange(u16),

    /// No assets would be accepted, so nothing could ever be deposited.
    #[error("accepted asset list is empty")]
    NoAcceptedAssets,

    /// The same asset address appears twice.
    #[error("asset {0} listed more than once")]
    DuplicateAsset(Address),

    /// `max_lock_secs` is beyond what timestamps can represent safely.
    #[error("max lock of {0}s exceeds supported ceiling of {MAX_SUPPORTED_LOCK_SECS}s")]
    LockCeilingTooHigh(u64),
}

/// Runtime configuration shared by a factory and every piggy bank it
/// deploys. Each piggy bank takes a copy at creation, so later changes
/// to a factory's config never reach existing vaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiggyConfig {
    /// Assets a piggy bank will take deposits in.
    pub accepted_assets: Vec<AssetInfo>,
    /// Early-exit penalty model.
    pub penalty: PenaltyModel,
    /// Destination for forfeited penalties.
    pub penalty_sink: PenaltySink,
    /// Longest lock a factory will accept, in seconds.
    pub max_lock_secs: u64,
}

impl Default for PiggyConfig {
    fn default() -> Self {
        Self {
            accepted_assets: default_accepted_assets(),
            penalty: PenaltyModel::default(),
            penalty_sink: PenaltySink::default(),
            max_lock_secs: DEFAULT_MAX_LOCK_SECS,
        }
    }
}

impl PiggyConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PiggyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy that routes penalties to `treasury`.
    pub fn with_treasury(mut self, treasury: Address) -> Self {
        self.penalty_sink = PenaltySink::Treasury { address: treasury };
        self
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bps = self.penalty.max_bps();
        if u64::from(bps) > BPS_DENOMINATOR {
            return Err(ConfigError::PenaltyOutOfRange(bps));
        }
        if self.accepted_assets.is_empty() {
            return Err(ConfigError::NoAcceptedAssets);
        }
        for (i, asset) in self.accepted_assets.iter().enumerate() {
            if self.accepted_assets[..i]
                .iter()
                .any(|other| other.address == asset.address)
            {
                return Err(ConfigError::DuplicateAsset(asset.address));
            }
        }
        if self.max_lock_secs > MAX_SUPPORTED_LOCK_SECS {
            return Err(ConfigError::LockCeilingTooHigh(self.max_lock_secs));
        }
        Ok(())
    }
}
