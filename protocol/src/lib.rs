// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # PiggyVault Core Library
//!
//! Primitives shared by the PiggyVault factory and its time-locked savings
//! vaults ("piggy banks"). Nothing in here knows what a piggy bank is; the
//! state machine lives in `piggy-contracts`.
//!
//! ## Modules
//!
//! - **address**: 20-byte addresses with hex and checksum rendering.
//! - **identity**: Ed25519 keypairs and the addresses they own.
//! - **crypto**: BLAKE3 / SHA-256 helpers with domain separation.
//! - **derivation**: predicting a vault's address from its parameters.
//! - **asset**: the accepted-asset list.
//! - **balance**: overflow-checked multi-asset balance sheet.
//! - **clock**: time sources; vaults read time, never write it.
//! - **events**: domain events and sinks.
//! - **config**: constants and the runtime `PiggyConfig`.
//! - **logging**: `tracing` subscriber setup.
//!
//! ## Ground Rules
//!
//! 1. Amounts are `u64` in smallest units. No floats, ever.
//! 2. Derivation is pure. No clocks, no counters.
//! 3. Every public type that crosses a boundary is serde-serializable.

pub mod address;
pub mod asset;
pub mod balance;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod derivation;
pub mod events;
pub mod identity;
pub mod logging;

pub use address::{Address, AddressError};
pub use asset::{AssetInfo, AssetRegistry};
pub use balance::{BalanceError, BalanceSheet};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, PenaltyModel, PenaltySink, PiggyConfig};
pub use events::{EventLog, EventRecord, EventSink, PiggyEvent, VaultState};
pub use identity::PiggyKeypair;
