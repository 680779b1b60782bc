//! Injectable time source.
//!
//! Signing and verification both read the current time through [`Clock`] so
//! expiry boundaries can be tested deterministically.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Current time as unix seconds.
    fn unix_now(&self) -> i64;

    /// Current time formatted as RFC 3339 (UTC).
    fn rfc3339_now(&self) -> crate::Result<String> {
        let now = OffsetDateTime::from_unix_timestamp(self.unix_now())
            .map_err(|e| crate::Error::InvalidTimestamp(e.to_string()))?;
        now.format(&Rfc3339)
            .map_err(|e| crate::Error::InvalidTimestamp(e.to_string()))
    }
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// A clock frozen at a settable instant. Used by tests.
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(unix_secs: i64) -> Self {
        Self {
            now: AtomicI64::new(unix_secs),
        }
    }

    /// Move the clock to `unix_secs`.
    pub fn set(&self, unix_secs: i64) {
        self.now.store(unix_secs, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for FixedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FixedClock").field(&self.unix_now()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let clock = FixedClock::new(1_700_000_000);
        assert_eq!(clock.unix_now(), 1_700_000_000);
        clock.advance(5);
        assert_eq!(clock.unix_now(), 1_700_000_005);
        clock.set(10);
        assert_eq!(clock.unix_now(), 10);
    }

    #[test]
    fn rfc3339_uses_utc() {
        let clock = FixedClock::new(1_700_000_000);
        assert_eq!(clock.rfc3339_now().unwrap(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn system_clock_is_after_2023() {
        assert!(SystemClock.unix_now() > 1_700_000_000);
    }
}
