//! # Piggy Bank Contract
//!
//! A time-locked, multi-asset savings vault with a single owner. The
//! lifecycle is:
//!
//! 1. **Create**: the factory deploys the piggy bank at its derived
//!    address with an owner, a lock duration and a purpose label. None of
//!    these ever change.
//! 2. **Save**: anyone may deposit any accepted asset, any number of times.
//! 3. **Unlock**: once `created_at + lock_duration` has passed the piggy
//!    bank is `Unlocked`. Nothing is stored for this; the state is computed
//!    from the clock on every call, so there is no transition to miss.
//! 4. **Withdraw**: the owner takes everything out and the piggy bank is
//!    `Drained` for good.
//!
//! Before unlock, the owner can still get out with an **emergency
//! withdrawal**, forfeiting a penalty on every asset. After unlock the
//! penalty is waived and an emergency withdrawal pays exactly what a normal
//! one would.
//!
//! ## Closed Means Closed
//!
//! A drained piggy bank rejects deposits and withdrawals alike with
//! [`PiggyError::VaultClosed`].
//!
//! ## Atomicity
//!
//! Every mutating method validates and computes its full effect before
//! touching any field. Any error leaves the piggy bank exactly as it was.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use piggy_protocol::address::Address;
use piggy_protocol::asset::AssetRegistry;
use piggy_protocol::balance::{BalanceError, BalanceSheet};
use piggy_protocol::config::{PenaltyModel, PenaltySink, PiggyConfig};
use piggy_protocol::events::VaultState;

use crate::penalty::split_balance;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during piggy bank operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PiggyError {
    /// Only the owner may withdraw.
    #[error("unauthorized: {caller} is not the owner of piggy bank {piggy}")]
    NotOwner {
        /// Who tried.
        caller: Address,
        /// The piggy bank they tried it on.
        piggy: Address,
    },

    /// Normal withdrawal attempted before the lock elapsed.
    #[error("piggy bank is locked until {unlock_at}")]
    StillLocked {
        /// When normal withdrawal becomes possible.
        unlock_at: DateTime<Utc>,
    },

    /// The asset is not on the accepted list.
    #[error("unsupported asset: {0}")]
    UnsupportedAsset(Address),

    /// The piggy bank has been drained and accepts nothing further.
    #[error("piggy bank {0} is drained and closed")]
    VaultClosed(Address),

    /// Every balance is zero.
    #[error("nothing to withdraw: all balances are zero")]
    NothingToWithdraw,

    /// Zero-amount deposits are rejected.
    #[error("zero-amount deposits are not permitted")]
    ZeroAmount,

    /// Balance arithmetic failed.
    #[error("balance error: {0}")]
    Balance(#[from] BalanceError),
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// What one asset paid out on withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// The asset.
    pub asset: Address,
    /// Amount sent to the owner.
    pub to_owner: u64,
    /// Amount forfeited. Zero unless this was an early emergency exit.
    pub penalty: u64,
    /// Where the penalty went.
    pub sink: PenaltySink,
}

/// Result of a successful withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// The piggy bank that was drained.
    pub piggy: Address,
    /// Who received the proceeds.
    pub owner: Address,
    /// `true` if taken through the emergency path.
    pub emergency: bool,
    /// One entry per asset with a non-zero balance, in address order.
    pub payouts: Vec<Payout>,
    /// When the withdrawal happened.
    pub withdrawn_at: DateTime<Utc>,
}

impl WithdrawalReceipt {
    /// Amount of `asset` the owner received.
    pub fn proceeds(&self, asset: &Address) -> u64 {
        self.payouts
            .iter()
            .find(|p| p.asset == *asset)
            .map(|p| p.to_owner)
            .unwrap_or(0)
    }

    /// Amount of `asset` forfeited.
    pub fn penalty(&self, asset: &Address) -> u64 {
        self.payouts
            .iter()
            .find(|p| p.asset == *asset)
            .map(|p| p.penalty)
            .unwrap_or(0)
    }

    /// Sum of all penalties across assets. Only meaningful for display;
    /// different assets are not fungible.
    pub fn total_penalty(&self) -> u128 {
        self.payouts.iter().map(|p| u128::from(p.penalty)).sum()
    }
}

// ---------------------------------------------------------------------------
// PiggyBank
// ---------------------------------------------------------------------------

/// A single piggy bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiggyBank {
    address: Address,
    factory: Address,
    owner: Address,
    lock_duration_secs: u64,
    purpose: String,
    created_at: DateTime<Utc>,
    unlock_at: DateTime<Utc>,
    accepted_assets: AssetRegistry,
    penalty: PenaltyModel,
    penalty_sink: PenaltySink,
    balances: BalanceSheet,
    withdrawn: bool,
    withdrawn_at: Option<DateTime<Utc>>,
}

impl PiggyBank {
    /// Creates an empty piggy bank. The factory is the normal caller; the
    /// accepted assets and penalty policy are copied out of `config`.
    ///
    /// A lock so long that the unlock instant is unrepresentable is pinned
    /// to the latest representable instant, i.e. it never unlocks.
    pub fn new(
        address: Address,
        factory: Address,
        owner: Address,
        lock_duration_secs: u64,
        purpose: String,
        created_at: DateTime<Utc>,
        config: &PiggyConfig,
    ) -> Self {
        let unlock_at = i64::try_from(lock_duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lock| created_at.checked_add_signed(lock))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            address,
            factory,
            owner,
            lock_duration_secs,
            purpose,
            created_at,
            unlock_at,
            accepted_assets: AssetRegistry::new(config.accepted_assets.iter().cloned()),
            penalty: config.penalty,
            penalty_sink: config.penalty_sink,
            balances: BalanceSheet::new(),
            withdrawn: false,
            withdrawn_at: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn lock_duration_secs(&self) -> u64 {
        self.lock_duration_secs
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// First instant at which normal withdrawal is allowed.
    pub fn unlock_at(&self) -> DateTime<Utc> {
        self.unlock_at
    }

    pub fn accepted_assets(&self) -> &AssetRegistry {
        &self.accepted_assets
    }

    pub fn penalty_model(&self) -> PenaltyModel {
        self.penalty
    }

    pub fn penalty_sink(&self) -> PenaltySink {
        self.penalty_sink
    }

    /// Returns `true` once any withdrawal has drained the piggy bank.
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawn
    }

    pub fn withdrawn_at(&self) -> Option<DateTime<Utc>> {
        self.withdrawn_at
    }

    /// Balance held in `asset`.
    pub fn balance_of(&self, asset: &Address) -> u64 {
        self.balances.balance_of(asset)
    }

    /// All non-zero balances in address order.
    pub fn balances(&self) -> Vec<(Address, u64)> {
        self.balances.non_zero()
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Lifecycle state at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> VaultState {
        if self.withdrawn {
            VaultState::Drained
        } else if now >= self.unlock_at {
            VaultState::Unlocked
        } else {
            VaultState::Open
        }
    }

    /// Seconds left on the lock at `now`, zero once unlocked.
    pub fn remaining_lock_secs(&self, now: DateTime<Utc>) -> u64 {
        let remaining = (self.unlock_at - now).num_seconds();
        u64::try_from(remaining).unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Adds `amount` of `asset`. Anyone may deposit. Returns the new
    /// balance for that asset.
    ///
    /// # Errors
    ///
    /// - [`PiggyError::VaultClosed`] once drained.
    /// - [`PiggyError::ZeroAmount`] if `amount` is zero.
    /// - [`PiggyError::UnsupportedAsset`] if `asset` is not accepted.
    /// - [`PiggyError::Balance`] if the balance would overflow.
    pub fn deposit(&mut self, asset: Address, amount: u64) -> Result<u64, PiggyError> {
        if self.withdrawn {
            return Err(PiggyError::VaultClosed(self.address));
        }
        if amount == 0 {
            return Err(PiggyError::ZeroAmount);
        }
        if !self.accepted_assets.is_accepted(&asset) {
            return Err(PiggyError::UnsupportedAsset(asset));
        }
        Ok(self.balances.credit(asset, amount)?)
    }

    /// Pays every balance out to the owner in full. Only after unlock.
    ///
    /// # Errors
    ///
    /// Checked in this order: [`PiggyError::NotOwner`],
    /// [`PiggyError::VaultClosed`], [`PiggyError::StillLocked`],
    /// [`PiggyError::NothingToWithdraw`].
    pub fn withdraw(
        &mut self,
        caller: &Address,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalReceipt, PiggyError> {
        self.ensure_owner(caller)?;
        if self.withdrawn {
            return Err(PiggyError::VaultClosed(self.address));
        }
        if self.state(now) == VaultState::Open {
            return Err(PiggyError::StillLocked {
                unlock_at: self.unlock_at,
            });
        }
        self.settle(false, now)
    }

    /// Pays every balance out to the owner at any time. Before unlock each
    /// asset forfeits a penalty to the configured sink; after unlock the
    /// penalty is waived.
    ///
    /// # Errors
    ///
    /// Checked in this order: [`PiggyError::NotOwner`],
    /// [`PiggyError::VaultClosed`], [`PiggyError::NothingToWithdraw`].
    pub fn emergency_withdraw(
        &mut self,
        caller: &Address,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalReceipt, PiggyError> {
        self.ensure_owner(caller)?;
        if self.withdrawn {
            return Err(PiggyError::VaultClosed(self.address));
        }
        self.settle(true, now)
    }

    /// What an emergency withdrawal at `now` would pay, without doing it.
    /// Empty once drained.
    pub fn quote_emergency(&self, now: DateTime<Utc>) -> Vec<Payout> {
        if self.withdrawn {
            return Vec::new();
        }
        self.compute_payouts(true, now)
    }

    fn ensure_owner(&self, caller: &Address) -> Result<(), PiggyError> {
        if *caller != self.owner {
            tracing::warn!(
                piggy = %self.address,
                caller = %caller,
                "withdrawal rejected: caller is not the owner"
            );
            return Err(PiggyError::NotOwner {
                caller: *caller,
                piggy: self.address,
            });
        }
        Ok(())
    }

    fn compute_payouts(&self, emergency: bool, now: DateTime<Utc>) -> Vec<Payout> {
        let penalised = emergency && self.state(now) == VaultState::Open;
        let remaining = self.remaining_lock_secs(now);

        self.balances
            .non_zero()
            .into_iter()
            .map(|(asset, balance)| {
                let (to_owner, penalty) = if penalised {
                    split_balance(&self.penalty, balance, self.lock_duration_secs, remaining)
                } else {
                    (balance, 0)
                };
                Payout {
                    asset,
                    to_owner,
                    penalty,
                    sink: self.penalty_sink,
                }
            })
            .collect()
    }

    /// Computes the payouts, then commits: drain, flag, timestamp.
    fn settle(
        &mut self,
        emergency: bool,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalReceipt, PiggyError> {
        let payouts = self.compute_payouts(emergency, now);
        if payouts.is_empty() {
            return Err(PiggyError::NothingToWithdraw);
        }

        self.balances.drain();
        self.withdrawn = true;
        self.withdrawn_at = Some(now);

        Ok(WithdrawalReceipt {
            piggy: self.address,
            owner: self.owner,
            emergency,
            payouts,
            withdrawn_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use piggy_protocol::config::{DAI_ADDRESS, USDC_ADDRESS, USDT_ADDRESS};

    const DAY: i64 = 86_400;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn owner() -> Address {
        Address::from_bytes([0x0A; 20])
    }

    fn piggy(lock_days: u64) -> PiggyBank {
        PiggyBank::new(
            Address::from_bytes([0xB0; 20]),
            Address::from_bytes([0xF0; 20]),
            owner(),
            lock_days * 86_400,
            "Vacation Fund".into(),
            t0(),
            &PiggyConfig::default(),
        )
    }

    #[test]
    fn new_piggy_starts_open_and_empty() {
        let p = piggy(30);
        assert_eq!(p.state(t0()), VaultState::Open);
        assert!(p.balances().is_empty());
        assert!(!p.is_withdrawn());
        assert_eq!(p.unlock_at(), t0() + Duration::days(30));
        assert_eq!(p.remaining_lock_secs(t0()), 30 * 86_400);
    }

    #[test]
    fn state_is_computed_from_time() {
        let p = piggy(30);
        assert_eq!(p.state(t0() + Duration::seconds(30 * DAY - 1)), VaultState::Open);
        assert_eq!(p.state(t0() + Duration::days(30)), VaultState::Unlocked);
        assert_eq!(p.remaining_lock_secs(t0() + Duration::days(31)), 0);
    }

    #[test]
    fn zero_lock_is_unlocked_immediately() {
        let p = piggy(0);
        assert_eq!(p.state(t0()), VaultState::Unlocked);
    }

    #[test]
    fn deposits_accumulate_per_asset() {
        let mut p = piggy(30);
        assert_eq!(p.deposit(USDC_ADDRESS, 100).unwrap(), 100);
        assert_eq!(p.deposit(USDC_ADDRESS, 50).unwrap(), 150);
        assert_eq!(p.deposit(DAI_ADDRESS, 7).unwrap(), 7);
        assert_eq!(p.balance_of(&USDC_ADDRESS), 150);
        assert_eq!(p.balance_of(&DAI_ADDRESS), 7);
        assert_eq!(p.balance_of(&USDT_ADDRESS), 0);
    }

    #[test]
    fn unsupported_asset_rejected() {
        let mut p = piggy(30);
        let junk = Address::from_bytes([0x99; 20]);
        assert_eq!(
            p.deposit(junk, 100),
            Err(PiggyError::UnsupportedAsset(junk))
        );
        assert!(p.balances().is_empty());
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut p = piggy(30);
        assert_eq!(p.deposit(USDC_ADDRESS, 0), Err(PiggyError::ZeroAmount));
    }

    #[test]
    fn overflowing_deposit_leaves_balance() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, u64::MAX).unwrap();
        assert!(matches!(
            p.deposit(USDC_ADDRESS, 1),
            Err(PiggyError::Balance(BalanceError::Overflow { .. }))
        ));
        assert_eq!(p.balance_of(&USDC_ADDRESS), u64::MAX);
    }

    #[test]
    fn withdraw_before_unlock_is_still_locked() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 100).unwrap();
        let err = p
            .withdraw(&owner(), t0() + Duration::days(29))
            .unwrap_err();
        assert_eq!(
            err,
            PiggyError::StillLocked {
                unlock_at: t0() + Duration::days(30)
            }
        );
        assert_eq!(p.balance_of(&USDC_ADDRESS), 100);
        assert!(!p.is_withdrawn());
    }

    #[test]
    fn withdraw_after_unlock_pays_everything() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 100).unwrap();
        p.deposit(DAI_ADDRESS, 5).unwrap();
        let now = t0() + Duration::days(31);
        let receipt = p.withdraw(&owner(), now).unwrap();

        assert!(!receipt.emergency);
        assert_eq!(receipt.proceeds(&USDC_ADDRESS), 100);
        assert_eq!(receipt.proceeds(&DAI_ADDRESS), 5);
        assert_eq!(receipt.total_penalty(), 0);
        assert_eq!(p.state(now), VaultState::Drained);
        assert!(p.balances().is_empty());
        assert_eq!(p.withdrawn_at(), Some(now));
    }

    #[test]
    fn non_owner_cannot_withdraw() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 100).unwrap();
        let stranger = Address::from_bytes([0x66; 20]);
        let later = t0() + Duration::days(40);

        for result in [
            p.withdraw(&stranger, later),
            p.emergency_withdraw(&stranger, later),
            p.emergency_withdraw(&stranger, t0()),
        ] {
            assert_eq!(
                result.unwrap_err(),
                PiggyError::NotOwner {
                    caller: stranger,
                    piggy: p.address()
                }
            );
        }
        assert_eq!(p.balance_of(&USDC_ADDRESS), 100);
        assert!(!p.is_withdrawn());
    }

    #[test]
    fn emergency_before_unlock_charges_penalty() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 100).unwrap();
        let receipt = p
            .emergency_withdraw(&owner(), t0() + Duration::days(29))
            .unwrap();
        assert!(receipt.emergency);
        assert_eq!(receipt.proceeds(&USDC_ADDRESS), 85);
        assert_eq!(receipt.penalty(&USDC_ADDRESS), 15);
        assert_eq!(receipt.payouts[0].sink, PenaltySink::Burn);
        assert!(p.is_withdrawn());
    }

    #[test]
    fn emergency_after_unlock_waives_penalty() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 100).unwrap();
        let receipt = p
            .emergency_withdraw(&owner(), t0() + Duration::days(30))
            .unwrap();
        assert_eq!(receipt.proceeds(&USDC_ADDRESS), 100);
        assert_eq!(receipt.penalty(&USDC_ADDRESS), 0);
    }

    #[test]
    fn drained_piggy_is_closed() {
        let mut p = piggy(0);
        p.deposit(USDC_ADDRESS, 100).unwrap();
        p.withdraw(&owner(), t0()).unwrap();

        let addr = p.address();
        assert_eq!(p.deposit(USDC_ADDRESS, 1), Err(PiggyError::VaultClosed(addr)));
        assert_eq!(
            p.withdraw(&owner(), t0()).unwrap_err(),
            PiggyError::VaultClosed(addr)
        );
        assert_eq!(
            p.emergency_withdraw(&owner(), t0()).unwrap_err(),
            PiggyError::VaultClosed(addr)
        );
        assert!(p.quote_emergency(t0()).is_empty());
    }

    #[test]
    fn empty_piggy_has_nothing_to_withdraw() {
        let mut p = piggy(0);
        assert_eq!(
            p.withdraw(&owner(), t0()).unwrap_err(),
            PiggyError::NothingToWithdraw
        );
        assert_eq!(
            p.emergency_withdraw(&owner(), t0()).unwrap_err(),
            PiggyError::NothingToWithdraw
        );
        // Still usable.
        assert!(!p.is_withdrawn());
        p.deposit(USDT_ADDRESS, 10).unwrap();
        assert_eq!(p.withdraw(&owner(), t0()).unwrap().proceeds(&USDT_ADDRESS), 10);
    }

    #[test]
    fn quote_matches_emergency_withdrawal() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 1_000).unwrap();
        p.deposit(DAI_ADDRESS, 2_000).unwrap();
        let now = t0() + Duration::days(3);
        let quote = p.quote_emergency(now);
        let receipt = p.emergency_withdraw(&owner(), now).unwrap();
        assert_eq!(quote, receipt.payouts);
    }

    #[test]
    fn linear_penalty_uses_remaining_lock() {
        let config = PiggyConfig {
            penalty: PenaltyModel::Linear { max_bps: 2_000 },
            ..PiggyConfig::default()
        }
        .with_treasury(Address::from_bytes([0x7E; 20]));
        let mut p = PiggyBank::new(
            Address::from_bytes([0xB1; 20]),
            Address::from_bytes([0xF0; 20]),
            owner(),
            30 * 86_400,
            "School".into(),
            t0(),
            &config,
        );
        p.deposit(USDC_ADDRESS, 3_000).unwrap();
        let receipt = p
            .emergency_withdraw(&owner(), t0() + Duration::days(15))
            .unwrap();
        assert_eq!(receipt.penalty(&USDC_ADDRESS), 300);
        assert_eq!(receipt.proceeds(&USDC_ADDRESS), 2_700);
        assert_eq!(
            receipt.payouts[0].sink,
            PenaltySink::Treasury {
                address: Address::from_bytes([0x7E; 20])
            }
        );
    }

    #[test]
    fn unrepresentable_lock_never_unlocks() {
        let p = piggy(u64::MAX / 86_400);
        assert_eq!(p.unlock_at(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(p.state(t0() + Duration::days(365 * 1_000)), VaultState::Open);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut p = piggy(30);
        p.deposit(USDC_ADDRESS, 42).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: PiggyBank = serde_json::from_str(&json).unwrap();
        assert_eq!(back.balance_of(&USDC_ADDRESS), 42);
        assert_eq!(back.owner(), owner());
        assert_eq!(back.unlock_at(), p.unlock_at());
    }
}
