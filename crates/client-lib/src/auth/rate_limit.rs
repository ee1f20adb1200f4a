// ============================
// crates/client-lib/src/auth/rate_limit.rs
// ============================
//! Client-side throttling of authentication attempts.
//!
//! The consecutive-failure counter lives in memory; the timestamp that arms
//! the cooldown is persisted so that restarting the client does not lift an
//! active cooldown.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::AuthLimits;
use crate::storage::{keys, ClientStorage};

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// The real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Outcome of checking the cooldown before an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The attempt may proceed
    Open,
    /// A persisted cooldown is still running
    CoolingDown { remaining: Duration },
    /// The in-memory counter is at the limit; the cooldown has just been armed
    Exhausted,
}

/// Consecutive-failure counter with a persisted cooldown
pub struct LoginThrottle {
    storage: Arc<dyn ClientStorage>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
}

impl LoginThrottle {
    pub fn new(storage: Arc<dyn ClientStorage>, clock: Arc<dyn Clock>, limits: &AuthLimits) -> Self {
        Self {
            storage,
            clock,
            max_attempts: limits.max_attempts,
            cooldown: limits.cooldown(),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Persisted timestamp of the failure that armed the cooldown
    pub fn last_failure(&self) -> Option<i64> {
        let raw = match self.storage.get(keys::LAST_FAILURE) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "could not read last failure timestamp");
                return None;
            },
        };
        match raw.trim().parse::<i64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                warn!(value = %raw, "discarding unreadable last failure timestamp");
                self.clear_persisted();
                None
            },
        }
    }

    /// Decide whether an attempt may reach the backend.
    ///
    /// A cooldown that has run out is cleared together with the counter, so
    /// the next attempt starts from a clean slate.
    pub fn check(&self) -> Gate {
        let now = self.clock.now_millis();

        if let Some(last) = self.last_failure() {
            let elapsed = now.saturating_sub(last).max(0);
            let cooldown_ms = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
            if elapsed < cooldown_ms {
                let remaining = Duration::from_millis(u64::try_from(cooldown_ms - elapsed).unwrap_or(0));
                return Gate::CoolingDown { remaining };
            }
            info!("login cooldown elapsed");
            self.clear_persisted();
            self.consecutive_failures.store(0, Ordering::SeqCst);
        }

        if self.consecutive_failures() >= self.max_attempts {
            self.arm(now);
            return Gate::Exhausted;
        }

        Gate::Open
    }

    /// Count one failed attempt. Returns `true` when this failure reached the
    /// limit and armed the cooldown.
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.max_attempts {
            self.arm(self.clock.now_millis());
            warn!(failures, "too many failed attempts, cooldown armed");
            return true;
        }
        false
    }

    /// Reset after a successful authentication
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.clear_persisted();
    }

    fn arm(&self, now: i64) {
        if let Err(e) = self.storage.set(keys::LAST_FAILURE, &now.to_string()) {
            warn!(error = %e, "could not persist last failure timestamp");
        }
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.storage.remove(keys::LAST_FAILURE) {
            warn!(error = %e, "could not clear last failure timestamp");
        }
    }
}
