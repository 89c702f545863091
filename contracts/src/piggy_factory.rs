//! # Piggy Factory Contract
//!
//! Deploys piggy banks at deterministic addresses and keeps a per-owner
//! registry of what it deployed.
//!
//! ## Address Prediction
//!
//! A piggy bank's address is a pure function of the factory address, the
//! owner, the lock duration and the purpose label (see
//! [`piggy_protocol::derivation`]). [`PiggyFactory::predict_address`] can be
//! called before creation and always matches what
//! [`PiggyFactory::create_piggy`] produces for the same arguments. The
//! flip side is that the same owner cannot create two piggy banks with
//! identical parameters; the second attempt fails with
//! [`FactoryError::DuplicateDerivation`], even if the first one has since
//! been drained.
//!
//! ## Concurrency
//!
//! - `piggies` and `registry` are `DashMap`s, so lookups from many threads
//!   don't contend on a global lock.
//! - `create_piggy` holds the owner's registry entry while claiming the
//!   address in `piggies`. Creations for one owner are serialized; creations
//!   for different owners proceed in parallel.
//! - Lock order is always `registry` then `piggies`.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use piggy_protocol::address::Address;
use piggy_protocol::clock::Clock;
use piggy_protocol::config::{ConfigError, PiggyConfig, MAX_PURPOSE_LENGTH};
use piggy_protocol::derivation::{derive_factory_address, derive_vault_address};
use piggy_protocol::events::{EventRecord, EventSink, PiggyEvent};

use crate::piggy_bank::PiggyBank;
use crate::piggy_handle::PiggyHandle;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during factory operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactoryError {
    /// A piggy bank already exists at the derived address.
    #[error("duplicate derivation: a piggy bank already exists at {address}")]
    DuplicateDerivation {
        /// The occupied address.
        address: Address,
    },

    /// The purpose label is too long.
    #[error("purpose label is {len} bytes; maximum is {max}")]
    PurposeTooLong {
        /// Length of the rejected label in bytes.
        len: usize,
        /// The limit.
        max: usize,
    },

    /// The lock duration exceeds the factory's ceiling.
    #[error("lock of {requested}s exceeds maximum of {max}s")]
    LockTooLong {
        /// Requested duration in seconds.
        requested: u64,
        /// The factory's `max_lock_secs`.
        max: u64,
    },
}

// ---------------------------------------------------------------------------
// PiggyFactory
// ---------------------------------------------------------------------------

/// The piggy bank factory.
pub struct PiggyFactory {
    address: Address,
    config: PiggyConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    /// Owner -> piggy banks in creation order.
    registry: DashMap<Address, Vec<Address>>,
    /// Every deployed piggy bank by address.
    piggies: DashMap<Address, PiggyHandle>,
}

impl std::fmt::Debug for PiggyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiggyFactory")
            .field("address", &self.address)
            .field("owners", &self.registry.len())
            .field("piggies", &self.piggies.len())
            .finish()
    }
}

impl PiggyFactory {
    /// Creates a factory at `address`. Fails if `config` does not validate.
    pub fn new(
        address: Address,
        config: PiggyConfig,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(
            factory = %address,
            assets = config.accepted_assets.len(),
            penalty = ?config.penalty,
            "piggy factory ready"
        );
        Ok(Self {
            address,
            config,
            clock,
            events,
            registry: DashMap::new(),
            piggies: DashMap::new(),
        })
    }

    /// Creates a factory at the address `deployer` gets for its `nonce`-th
    /// deployment.
    pub fn deploy(
        deployer: &Address,
        nonce: u64,
        config: PiggyConfig,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        Self::new(derive_factory_address(deployer, nonce), config, clock, events)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &PiggyConfig {
        &self.config
    }

    /// Address [`create_piggy`](Self::create_piggy) would produce for these
    /// arguments. Pure; works whether or not the piggy bank exists.
    ///
    /// # Errors
    ///
    /// Rejects the same oversized purpose labels and lock durations that
    /// `create_piggy` rejects, so every predicted address is creatable.
    /// An occupied address is not an error here.
    pub fn predict_address(
        &self,
        owner: &Address,
        lock_duration_secs: u64,
        purpose: &str,
    ) -> Result<Address, FactoryError> {
        self.check_request(lock_duration_secs, purpose)?;
        let predicted = derive_vault_address(&self.address, owner, lock_duration_secs, purpose);
        tracing::debug!(
            factory = %self.address,
            owner = %owner,
            lock_duration_secs,
            piggy = %predicted,
            "predicted piggy address"
        );
        Ok(predicted)
    }

    fn check_request(&self, lock_duration_secs: u64, purpose: &str) -> Result<(), FactoryError> {
        if purpose.len() > MAX_PURPOSE_LENGTH {
            return Err(FactoryError::PurposeTooLong {
                len: purpose.len(),
                max: MAX_PURPOSE_LENGTH,
            });
        }
        if lock_duration_secs > self.config.max_lock_secs {
            return Err(FactoryError::LockTooLong {
                requested: lock_duration_secs,
                max: self.config.max_lock_secs,
            });
        }
        Ok(())
    }

    /// Deploys a piggy bank owned by `caller`.
    ///
    /// # Errors
    ///
    /// - [`FactoryError::PurposeTooLong`] if `purpose` exceeds
    ///   [`MAX_PURPOSE_LENGTH`] bytes.
    /// - [`FactoryError::LockTooLong`] if the lock exceeds the configured
    ///   maximum.
    /// - [`FactoryError::DuplicateDerivation`] if the derived address is
    ///   already occupied.
    pub fn create_piggy(
        &self,
        caller: &Address,
        lock_duration_secs: u64,
        purpose: &str,
    ) -> Result<Address, FactoryError> {
        self.check_request(lock_duration_secs, purpose)?;

        let address = derive_vault_address(&self.address, caller, lock_duration_secs, purpose);
        let now = self.clock.now();

        {
            let mut owned = self.registry.entry(*caller).or_default();
            match self.piggies.entry(address) {
                Entry::Occupied(_) => {
                    tracing::warn!(
                        factory = %self.address,
                        owner = %caller,
                        piggy = %address,
                        "duplicate piggy derivation rejected"
                    );
                    return Err(FactoryError::DuplicateDerivation { address });
                }
                Entry::Vacant(slot) => {
                    let piggy = PiggyBank::new(
                        address,
                        self.address,
                        *caller,
                        lock_duration_secs,
                        purpose.to_owned(),
                        now,
                        &self.config,
                    );
                    slot.insert(PiggyHandle::new(
                        piggy,
                        Arc::clone(&self.clock),
                        Arc::clone(&self.events),
                    ));
                }
            }
            owned.push(address);
        }

        tracing::info!(
            factory = %self.address,
            owner = %caller,
            piggy = %address,
            lock_duration_secs,
            purpose,
            "piggy bank created"
        );
        self.events.emit(EventRecord::new(
            PiggyEvent::PiggyCreated {
                factory: self.address,
                owner: *caller,
                piggy: address,
                lock_duration_secs,
                purpose: purpose.to_owned(),
            },
            now,
        ));

        Ok(address)
    }

    /// Piggy banks owned by `owner`, in creation order.
    pub fn get_user_piggies(&self, owner: &Address) -> Vec<Address> {
        self.registry
            .get(owner)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    /// Handle to the piggy bank at `address`, if this factory deployed one.
    pub fn piggy(&self, address: &Address) -> Option<PiggyHandle> {
        self.piggies.get(address).map(|entry| entry.value().clone())
    }

    /// Number of piggy banks deployed.
    pub fn piggy_count(&self) -> usize {
        self.piggies.len()
    }
}
