//! # Accepted Assets
//!
//! A piggy bank holds a small fixed set of stable-value assets. Each asset
//! is referenced by its external contract [`Address`]; the protocol
//! attaches no meaning to it beyond membership in the accepted list.
//! `symbol` and `decimals` are carried for display only. Arithmetic is
//! always done on raw `u64` amounts in the asset's smallest unit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Display metadata for an accepted asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetInfo {
    /// External contract address. This is the asset's identity.
    pub address: Address,
    /// Ticker, e.g. "USDC".
    pub symbol: String,
    /// Decimal places used when rendering amounts.
    pub decimals: u8,
}

impl AssetInfo {
    /// Creates asset metadata.
    pub fn new(address: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// Renders a raw amount with this asset's decimals, e.g. `1_500_000`
    /// USDC (6 decimals) as `"1.5 USDC"`. Trailing zeros are trimmed.
    pub fn format_amount(&self, amount: u64) -> String {
        if self.decimals == 0 {
            return format!("{} {}", amount, self.symbol);
        }
        let scale = 10u128
            .checked_pow(u32::from(self.decimals))
            .unwrap_or(u128::MAX);
        let whole = u128::from(amount) / scale;
        let frac = u128::from(amount) % scale;
        if frac == 0 {
            return format!("{} {}", whole, self.symbol);
        }
        let frac = format!("{:0width$}", frac, width = self.decimals as usize);
        format!("{}.{} {}", whole, frac.trim_end_matches('0'), self.symbol)
    }
}

impl fmt::Display for AssetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// The accepted-asset list of a piggy bank, indexed by address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistry {
    assets: BTreeMap<Address, AssetInfo>,
}

impl AssetRegistry {
    /// Builds a registry from a list. Later duplicates replace earlier ones;
    /// [`crate::config::PiggyConfig::validate`] rejects duplicates upstream.
    pub fn new(assets: impl IntoIterator<Item = AssetInfo>) -> Self {
        Self {
            assets: assets
                .into_iter()
                .map(|info| (info.address, info))
                .collect(),
        }
    }

    /// Returns `true` if deposits in `asset` are accepted.
    pub fn is_accepted(&self, asset: &Address) -> bool {
        self.assets.contains_key(asset)
    }

    /// Looks up display metadata.
    pub fn get(&self, asset: &Address) -> Option<&AssetInfo> {
        self.assets.get(asset)
    }

    /// Iterates accepted assets in address order.
    pub fn iter(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.values()
    }

    /// Number of accepted assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if nothing is accepted.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
