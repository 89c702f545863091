//! # Time Source
//!
//! Piggy banks read time and never write it. Everything that needs "now"
//! gets it from a [`Clock`], so the whole lock/unlock state machine can be
//! driven deterministically in tests with a [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;

/// A source of the current time.
///
/// Implementations must never return an instant earlier than one they
/// already returned.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time at microsecond resolution.
///
/// The system clock can be stepped backwards (NTP corrections, manual
/// changes). `SystemClock` keeps the latest instant it has handed out and
/// repeats it until the wall clock catches up. Clones share that mark.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    high_water_micros: Arc<AtomicI64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let wall_micros = wall.timestamp_micros();
        let seen = self
            .high_water_micros
            .fetch_max(wall_micros, Ordering::AcqRel);
        DateTime::from_timestamp_micros(seen.max(wall_micros)).unwrap_or(wall)
    }
}

/// A clock that only moves when told to, and only forward.
///
/// Clones share the same underlying instant, so a test can hand one clone
/// to a factory and keep another to advance time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Starts the clock at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Starts the clock at a Unix timestamp (seconds). Out-of-range values
    /// fall back to the epoch.
    pub fn at_unix(secs: i64) -> Self {
        let start = Utc
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self::new(start)
    }

    /// Moves the clock forward by `secs` seconds, saturating at chrono's
    /// maximum representable instant.
    pub fn advance_secs(&self, secs: u64) {
        let mut now = self.now.write();
        let step = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        *now = now.checked_add_signed(step).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Moves the clock forward by whole days.
    pub fn advance_days(&self, days: u64) {
        self.advance_secs(days.saturating_mul(86_400));
    }

    /// Moves the clock to `target` if it is later than now. Earlier targets
    /// are ignored so the clock never runs backwards.
    pub fn advance_to(&self, target: DateTime<Utc>) {
        let mut now = self.now.write();
        if target > *now {
            *now = target;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at_unix(1_700_000_000);
        let start = clock.now();
        clock.advance_days(29);
        assert_eq!((clock.now() - start).num_days(), 29);
        clock.advance_secs(3_600);
        assert_eq!((clock.now() - start).num_seconds(), 29 * 86_400 + 3_600);
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::at_unix(1_700_000_000);
        let start = clock.now();
        clock.advance_to(start - Duration::days(1));
        assert_eq!(clock.now(), start);
        clock.advance_to(start + Duration::days(1));
        assert_eq!(clock.now(), start + Duration::days(1));
    }

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::at_unix(0);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        clock.advance_secs(10);
        assert_eq!(shared.now().timestamp(), 10);
    }

    #[test]
    fn advance_saturates() {
        let clock = ManualClock::at_unix(0);
        clock.advance_secs(u64::MAX);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn system_clock_is_close_to_now() {
        let delta = Utc::now() - SystemClock::new().now();
        assert!(delta.num_seconds().abs() < 5);
    }

    #[test]
    fn system_clock_holds_through_a_backward_step() {
        // As if the wall clock had been an hour ahead and was then corrected.
        let ahead = Utc::now() + Duration::hours(1);
        let clock = SystemClock {
            high_water_micros: Arc::new(AtomicI64::new(ahead.timestamp_micros())),
        };
        let shared = clock.clone();

        assert_eq!(clock.now().timestamp_micros(), ahead.timestamp_micros());
        assert_eq!(shared.now(), clock.now());
    }

    #[test]
    fn system_clock_is_non_decreasing() {
        let clock = SystemClock::new();
        let mut last = clock.now();
        for _ in 0..1_000 {
            let next = clock.now();
            assert!(next >= last);
            last = next;
        }
    }
}
