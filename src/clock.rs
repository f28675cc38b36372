//! Wall-clock source shared by the stores.
//!
//! Session expiry is a pure time comparison, so every store reads "now" through a
//! [`Clock`] handle instead of calling `SystemTime` directly. Tests drive expiry with a
//! [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime};

pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the unix epoch.
    fn now_unix_ms(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now_unix_ms: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_unix_ms: i64) -> Self {
        Self {
            now_unix_ms: AtomicI64::new(start_unix_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_unix_ms
            .fetch_add(duration_to_ms(by), Ordering::SeqCst);
    }

    pub fn set(&self, unix_ms: i64) {
        self.now_unix_ms.store(unix_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_ms(&self) -> i64 {
        self.now_unix_ms.load(Ordering::SeqCst)
    }
}

/// Convert a duration to whole milliseconds, saturating at `i64::MAX`.
pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
