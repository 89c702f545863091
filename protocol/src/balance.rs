//! # Multi-Asset Balance Sheet
//!
//! The per-vault ledger: asset address to raw `u64` amount. Credits are
//! overflow-checked and a drain empties every entry in one call, which is
//! what lets a piggy bank commit a withdrawal as a single step.
//!
//! Entries are kept in a `BTreeMap` so payouts and events come out in a
//! stable order regardless of deposit history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;

/// Errors from balance arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    /// Crediting would push the balance past `u64::MAX`.
    #[error("balance overflow: current {current}, credit {credit} (asset {asset})")]
    Overflow {
        /// The asset being credited.
        asset: Address,
        /// Balance before the failed credit.
        current: u64,
        /// Amount that caused the overflow.
        credit: u64,
    },
}

/// Asset balances held by one vault.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    balances: BTreeMap<Address, u64>,
}

impl BalanceSheet {
    /// Creates an empty sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to `asset` and returns the new balance.
    ///
    /// On overflow the sheet is left untouched.
    pub fn credit(&mut self, asset: Address, amount: u64) -> Result<u64, BalanceError> {
        let current = self.balance_of(&asset);
        let updated = current.checked_add(amount).ok_or(BalanceError::Overflow {
            asset,
            current,
            credit: amount,
        })?;
        self.balances.insert(asset, updated);
        Ok(updated)
    }

    /// Current balance of `asset`, zero if never credited.
    pub fn balance_of(&self, asset: &Address) -> u64 {
        self.balances.get(asset).copied().unwrap_or(0)
    }

    /// All non-zero balances in address order.
    pub fn non_zero(&self) -> Vec<(Address, u64)> {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(asset, amount)| (*asset, *amount))
            .collect()
    }

    /// Returns `true` if every balance is zero.
    pub fn is_zero(&self) -> bool {
        self.balances.values().all(|amount| *amount == 0)
    }

    /// Empties the sheet and returns what it held (non-zero entries only).
    pub fn drain(&mut self) -> Vec<(Address, u64)> {
        let held = self.non_zero();
        self.balances.clear();
        held
    }
}
