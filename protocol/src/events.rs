//! # Events
//!
//! Everything observable about a factory or piggy bank leaves through an
//! [`EventSink`]. Reporting layers and monitors consume these; nothing in
//! the core reads them back.
//!
//! - `PiggyCreated` is emitted exactly once per successful creation and
//!   carries the resolved address, so a caller can check it against the
//!   address it predicted.
//! - `Deposited` / `Withdrawn` are emitted on every successful
//!   balance-changing call. A withdrawal emits one `Withdrawn` per asset
//!   paid out.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;

/// Lifecycle state of a piggy bank, as observed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultState {
    /// Lock still running. Deposits accepted, only emergency exit allowed.
    Open,
    /// Lock elapsed. Normal withdrawal allowed.
    Unlocked,
    /// Fully withdrawn. Terminal.
    Drained,
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultState::Open => write!(f, "Open"),
            VaultState::Unlocked => write!(f, "Unlocked"),
            VaultState::Drained => write!(f, "Drained"),
        }
    }
}

/// A domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PiggyEvent {
    /// A factory deployed a new piggy bank.
    PiggyCreated {
        factory: Address,
        owner: Address,
        piggy: Address,
        lock_duration_secs: u64,
        purpose: String,
    },
    /// Funds entered a piggy bank.
    Deposited {
        piggy: Address,
        depositor: Address,
        asset: Address,
        amount: u64,
        new_balance: u64,
        state: VaultState,
    },
    /// Funds left a piggy bank. `amount` is what the owner received;
    /// `penalty` is what was forfeited (zero for a normal withdrawal or
    /// an emergency withdrawal after unlock).
    Withdrawn {
        piggy: Address,
        owner: Address,
        asset: Address,
        amount: u64,
        penalty: u64,
        emergency: bool,
        state: VaultState,
    },
}

impl PiggyEvent {
    /// The piggy bank this event concerns.
    pub fn piggy(&self) -> Address {
        match self {
            PiggyEvent::PiggyCreated { piggy, .. }
            | PiggyEvent::Deposited { piggy, .. }
            | PiggyEvent::Withdrawn { piggy, .. } => *piggy,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PiggyEvent::PiggyCreated { .. } => "PiggyCreated",
            PiggyEvent::Deposited { .. } => "Deposited",
            PiggyEvent::Withdrawn { .. } => "Withdrawn",
        }
    }
}

/// An event stamped with a unique id and emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub emitted_at: DateTime<Utc>,
    pub event: PiggyEvent,
}

impl EventRecord {
    /// Stamps `event` with a fresh id.
    pub fn new(event: PiggyEvent, emitted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            emitted_at,
            event,
        }
    }
}

/// Destination for emitted events. Must not fail and must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, record: EventRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _record: EventRecord) {}
}

/// Writes each event as a structured `tracing` record at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, record: EventRecord) {
        let payload = serde_json::to_string(&record.event).unwrap_or_default();
        tracing::info!(
            target: "piggy::events",
            id = %record.id,
            kind = record.event.kind(),
            piggy = %record.event.piggy(),
            payload = %payload,
            "event"
        );
    }
}

/// In-memory, append-only event log.
#[derive(Debug, Default)]
pub struct EventLog {
    records: RwLock<Vec<EventRecord>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record in emission order.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.read().clone()
    }

    /// Events only, in emission order.
    pub fn events(&self) -> Vec<PiggyEvent> {
        self.records.read().iter().map(|r| r.event.clone()).collect()
    }

    /// Events concerning one piggy bank.
    pub fn events_for(&self, piggy: &Address) -> Vec<PiggyEvent> {
        self.records
            .read()
            .iter()
            .filter(|r| r.event.piggy() == *piggy)
            .map(|r| r.event.clone())
            .collect()
    }

    /// The address carried by the most recent `PiggyCreated` for `owner`.
    pub fn last_created_by(&self, owner: &Address) -> Option<Address> {
        self.records.read().iter().rev().find_map(|r| match &r.event {
            PiggyEvent::PiggyCreated {
                owner: o, piggy, ..
            } if o == owner => Some(*piggy),
            _ => None,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Renders the log as newline-delimited JSON.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for record in self.records.read().iter() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl EventSink for EventLog {
    fn emit(&self, record: EventRecord) {
        self.records.write().push(record);
    }
}

/// Forwards every event to several sinks in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    /// Creates a fanout over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, record: EventRecord) {
        for sink in &self.sinks {
            sink.emit(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(owner: u8, piggy: u8) -> PiggyEvent {
        PiggyEvent::PiggyCreated {
            factory: Address::from_bytes([0xFF; 20]),
            owner: Address::from_bytes([owner; 20]),
            piggy: Address::from_bytes([piggy; 20]),
            lock_duration_secs: 60,
            purpose: "Vacation Fund".into(),
        }
    }

    #[test]
    fn log_keeps_emission_order() {
        let log = EventLog::new();
        log.emit(EventRecord::new(created(1, 10), Utc::now()));
        log.emit(EventRecord::new(created(1, 11), Utc::now()));
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].piggy(), Address::from_bytes([10; 20]));
        assert_eq!(
            log.last_created_by(&Address::from_bytes([1; 20])),
            Some(Address::from_bytes([11; 20]))
        );
        assert_eq!(log.last_created_by(&Address::from_bytes([2; 20])), None);
    }

    #[test]
    fn records_get_unique_ids() {
        let a = EventRecord::new(created(1, 10), Utc::now());
        let b = EventRecord::new(created(1, 10), Utc::now());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(created(1, 10)).unwrap();
        assert_eq!(json["type"], "PiggyCreated");
        assert_eq!(json["purpose"], "Vacation Fund");
        assert_eq!(json["piggy"], Address::from_bytes([10; 20]).to_hex());
    }

    #[test]
    fn json_lines_round_trip() {
        let log = EventLog::new();
        log.emit(EventRecord::new(created(1, 10), Utc::now()));
        log.emit(EventRecord::new(
            PiggyEvent::Deposited {
                piggy: Address::from_bytes([10; 20]),
                depositor: Address::from_bytes([1; 20]),
                asset: Address::from_bytes([3; 20]),
                amount: 100,
                new_balance: 100,
                state: VaultState::Open,
            },
            Utc::now(),
        ));
        let lines = log.to_json_lines().unwrap();
        let parsed: Vec<EventRecord> = lines
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, log.records());
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(EventLog::new());
        let b = Arc::new(EventLog::new());
        let sinks: Vec<Arc<dyn EventSink>> = vec![a.clone(), b.clone(), Arc::new(NullSink)];
        let fanout = FanoutSink::new(sinks);
        fanout.emit(EventRecord::new(created(1, 10), Utc::now()));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(a.records()[0].id, b.records()[0].id);
    }

    #[test]
    fn events_for_filters_by_piggy() {
        let log = EventLog::new();
        log.emit(EventRecord::new(created(1, 10), Utc::now()));
        log.emit(EventRecord::new(created(1, 11), Utc::now()));
        assert_eq!(log.events_for(&Address::from_bytes([11; 20])).len(), 1);
    }
}
