//! Time sources.
//!
//! Core functions take `now` as an argument; only the façade and the
//! dispatcher read a `Clock`, so tests and replays can drive time by hand.

use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::error::{GameError, GameResult};
use crate::model::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) -> Timestamp {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
        *now
    }

    /// Like `advance`, but leaves the clock alone and returns `None` when
    /// the result would leave the calendar.
    pub fn try_advance(&self, by: Duration) -> Option<Timestamp> {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(by)?;
        Some(*now)
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `at` plus fractional `seconds`, rounded to the millisecond.
///
/// Fails with `InvalidOrder` when the instant cannot be represented.
pub fn after(at: Timestamp, seconds: f64) -> GameResult<Timestamp> {
    let millis = (seconds * 1000.0).round();
    let later = if millis.is_finite() {
        Duration::try_milliseconds(millis as i64).and_then(|d| at.checked_add_signed(d))
    } else {
        None
    };
    later.ok_or_else(|| GameError::invalid(format!("{seconds:.0} seconds after {at} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::t0;

    #[test]
    fn manual_clock_moves_only_on_request() {
        let clock = ManualClock::new(t0());
        assert_eq!(clock.now(), t0());
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), t0() + Duration::minutes(5));
        clock.set(t0());
        assert_eq!(clock.now(), t0());
    }

    #[test]
    fn after_rounds_to_milliseconds() {
        assert_eq!(after(t0(), 1.5).unwrap(), t0() + Duration::milliseconds(1500));
        assert_eq!(after(t0(), 0.0004).unwrap(), t0());
    }

    #[test]
    fn after_rejects_instants_past_the_calendar() {
        assert!(matches!(after(t0(), 1e16), Err(GameError::InvalidOrder(_))));
        assert!(matches!(after(t0(), f64::INFINITY), Err(GameError::InvalidOrder(_))));
    }

    #[test]
    fn overflowing_advance_leaves_the_clock_alone() {
        let clock = ManualClock::new(t0());
        assert_eq!(clock.try_advance(Duration::seconds(i64::MAX / 1000)), None);
        assert_eq!(clock.now(), t0());
        assert_eq!(clock.try_advance(Duration::hours(2)), Some(t0() + Duration::hours(2)));
    }
}
