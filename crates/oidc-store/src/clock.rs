//! Expiry clock.
//!
//! All timestamps are whole epoch seconds. Expiry is computed on write and
//! enforced on every read, independent of whether the backend ever removes
//! the row physically.

use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

/// Source of the current time in epoch seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time as whole seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Clock that only moves when told to. Used by tests and local tooling.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward by `secs` seconds.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Computes the absolute expiry for a write made at `now`.
///
/// A missing or zero TTL means the artifact never expires via TTL.
#[must_use]
pub fn expires_at(now: i64, ttl_secs: Option<u64>) -> Option<i64> {
    match ttl_secs {
        Some(ttl) if ttl > 0 => Some(now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX))),
        _ => None,
    }
}

/// Returns `true` once `now` has reached the expiry timestamp.
#[must_use]
pub fn is_expired(expires_at: Option<i64>, now: i64) -> bool {
    expires_at.is_some_and(|at| now >= at)
}
