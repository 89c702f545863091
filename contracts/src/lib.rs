// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PiggyVault Contracts
//!
//! The two contracts that make up PiggyVault:
//!
//! - **Piggy Factory**: deploys piggy banks at addresses that can be
//!   predicted before deployment, and remembers which owner has which.
//! - **Piggy Bank**: a time-locked, multi-asset savings vault. Anyone can
//!   fund it; only the owner can empty it, either after the lock elapses or
//!   early through an emergency withdrawal that forfeits a penalty.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Penalties are computed in
//!    `u128` and round up, so an early exit never pays out in full.
//! 2. Time is read from a [`Clock`](piggy_protocol::Clock) and never stored
//!    as state; "unlocked" is a predicate, not a transition.
//! 3. Every mutation either fully happens or leaves nothing behind.
//! 4. Every public type is serializable (serde).

pub mod penalty;
pub mod piggy_bank;
pub mod piggy_factory;
pub mod piggy_handle;

pub use piggy_bank::{Payout, PiggyBank, PiggyError, WithdrawalReceipt};
pub use piggy_factory::{FactoryError, PiggyFactory};
pub use piggy_handle::PiggyHandle;
