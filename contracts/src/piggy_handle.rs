//! Shared, thread-safe access to a deployed piggy bank.
//!
//! A [`PiggyHandle`] owns the piggy bank behind a `parking_lot::Mutex` and
//! pairs it with the factory's clock and event sink. Every operation takes
//! the lock, then reads the clock once, runs against the piggy bank, and
//! emits its events before releasing the lock. Per piggy bank, events
//! appear in mutation order with non-decreasing timestamps.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use piggy_protocol::address::Address;
use piggy_protocol::clock::Clock;
use piggy_protocol::events::{EventRecord, EventSink, PiggyEvent, VaultState};

use crate::piggy_bank::{Payout, PiggyBank, PiggyError, WithdrawalReceipt};

/// Cloneable handle to one piggy bank. Clones refer to the same vault.
#[derive(Clone)]
pub struct PiggyHandle {
    inner: Arc<Mutex<PiggyBank>>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for PiggyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let piggy = self.inner.lock();
        f.debug_struct("PiggyHandle")
            .field("address", &piggy.address())
            .field("owner", &piggy.owner())
            .field("withdrawn", &piggy.is_withdrawn())
            .finish()
    }
}

impl PiggyHandle {
    pub(crate) fn new(piggy: PiggyBank, clock: Arc<dyn Clock>, events: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(piggy)),
            clock,
            events,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Deposits `amount` of `asset` on behalf of `depositor`. Returns the
    /// new balance.
    pub fn deposit(
        &self,
        depositor: &Address,
        asset: Address,
        amount: u64,
    ) -> Result<u64, PiggyError> {
        let mut piggy = self.inner.lock();
        let now = self.clock.now();
        let new_balance = piggy.deposit(asset, amount)?;

        tracing::debug!(
            piggy = %piggy.address(),
            depositor = %depositor,
            asset = %asset,
            amount,
            new_balance,
            "deposit accepted"
        );

        self.events.emit(EventRecord::new(
            PiggyEvent::Deposited {
                piggy: piggy.address(),
                depositor: *depositor,
                asset,
                amount,
                new_balance,
                state: piggy.state(now),
            },
            now,
        ));
        Ok(new_balance)
    }

    /// Normal withdrawal by `caller`. See [`PiggyBank::withdraw`].
    pub fn withdraw(&self, caller: &Address) -> Result<WithdrawalReceipt, PiggyError> {
        let mut piggy = self.inner.lock();
        let now = self.clock.now();
        let receipt = piggy.withdraw(caller, now)?;
        self.publish_withdrawal(&receipt, now);
        Ok(receipt)
    }

    /// Emergency withdrawal by `caller`. See [`PiggyBank::emergency_withdraw`].
    pub fn emergency_withdraw(&self, caller: &Address) -> Result<WithdrawalReceipt, PiggyError> {
        let mut piggy = self.inner.lock();
        let now = self.clock.now();
        let receipt = piggy.emergency_withdraw(caller, now)?;
        self.publish_withdrawal(&receipt, now);
        Ok(receipt)
    }

    fn publish_withdrawal(&self, receipt: &WithdrawalReceipt, now: DateTime<Utc>) {
        tracing::info!(
            piggy = %receipt.piggy,
            owner = %receipt.owner,
            emergency = receipt.emergency,
            assets = receipt.payouts.len(),
            "piggy bank drained"
        );
        for payout in &receipt.payouts {
            self.events.emit(EventRecord::new(
                PiggyEvent::Withdrawn {
                    piggy: receipt.piggy,
                    owner: receipt.owner,
                    asset: payout.asset,
                    amount: payout.to_owner,
                    penalty: payout.penalty,
                    emergency: receipt.emergency,
                    state: VaultState::Drained,
                },
                now,
            ));
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Lifecycle state right now.
    pub fn state(&self) -> VaultState {
        let piggy = self.inner.lock();
        piggy.state(self.clock.now())
    }

    /// Preview of an emergency withdrawal right now.
    pub fn quote_emergency(&self) -> Vec<Payout> {
        let piggy = self.inner.lock();
        piggy.quote_emergency(self.clock.now())
    }

    pub fn balance_of(&self, asset: &Address) -> u64 {
        self.inner.lock().balance_of(asset)
    }

    pub fn balances(&self) -> Vec<(Address, u64)> {
        self.inner.lock().balances()
    }

    pub fn address(&self) -> Address {
        self.inner.lock().address()
    }

    pub fn owner(&self) -> Address {
        self.inner.lock().owner()
    }

    pub fn purpose(&self) -> String {
        self.inner.lock().purpose().to_owned()
    }

    pub fn lock_duration_secs(&self) -> u64 {
        self.inner.lock().lock_duration_secs()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.lock().created_at()
    }

    pub fn unlock_at(&self) -> DateTime<Utc> {
        self.inner.lock().unlock_at()
    }

    pub fn is_withdrawn(&self) -> bool {
        self.inner.lock().is_withdrawn()
    }

    /// A consistent copy of the whole piggy bank.
    pub fn snapshot(&self) -> PiggyBank {
        self.inner.lock().clone()
    }
}
