//! # Reservation Clock
//!
//! Time source for reservation windows, plus the cosmetic countdown derived from a line's
//! `expires_at`. Production code reads [`SystemClock`]; tests drive a [`ManualClock`] so
//! expiry can be exercised without sleeping.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, PoisonError};

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Time left before `expires_at`, never negative. Purely cosmetic.
pub fn countdown(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now).max(Duration::zero())
}

/// `mm:ss` rendering of a countdown, e.g. `19:59`.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::minutes(21));
        assert_eq!(clock.now(), start() + Duration::minutes(21));
    }

    #[test]
    fn test_countdown_never_negative() {
        let expires_at = start() + Duration::minutes(20);
        assert_eq!(countdown(expires_at, start()), Duration::minutes(20));
        assert_eq!(
            countdown(expires_at, start() + Duration::minutes(25)),
            Duration::zero()
        );
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(Duration::seconds(1199)), "19:59");
        assert_eq!(format_countdown(Duration::seconds(5)), "00:05");
        assert_eq!(format_countdown(Duration::seconds(-3)), "00:00");
    }
}
