//! Quota tracking for the directory search endpoint.
//!
//! The tracker behaves as a circuit breaker: it opens when upstream reports
//! quota exhaustion and stays open until the announced reset instant. Both the
//! debounce controller and the orchestrator consult it before issuing network
//! calls.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::ports::RateLimitHint;

/// Shortest block applied when an announced reset instant has already passed.
///
/// Upstream reports resets in whole epoch seconds, so a rejection can arrive
/// with a reset in the current second or slightly behind the local clock.
pub const MIN_RESET_DELAY: Duration = Duration::from_secs(1);

/// Rate-limit flag exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStatus {
    /// Searches may reach the network.
    Clear,
    /// Quota is exhausted until `until`.
    Exceeded {
        /// Instant at which upstream quota resets.
        until: DateTime<Utc>,
    },
}

impl RateLimitStatus {
    /// Return whether the flag is set.
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }
}

/// Shared quota state for one client session.
pub struct RateLimitTracker {
    clock: Arc<dyn Clock>,
    default_cooldown: Duration,
    reset_at: Mutex<Option<DateTime<Utc>>>,
}

impl RateLimitTracker {
    /// Build a tracker that falls back to `default_cooldown` when upstream
    /// does not announce a reset time.
    pub fn new(clock: Arc<dyn Clock>, default_cooldown: Duration) -> Self {
        Self {
            clock,
            default_cooldown,
            reset_at: Mutex::new(None),
        }
    }

    /// Open the breaker and return the instant at which it closes again.
    ///
    /// A later reset instant already on record is kept. The returned instant
    /// always lies in the future, so the flag reads as exceeded immediately
    /// afterwards.
    pub fn mark_exceeded(&self, hint: &RateLimitHint) -> DateTime<Utc> {
        let now = self.clock.utc();
        let until = match *hint {
            RateLimitHint::ResetAt(at) => at.max(offset(now, MIN_RESET_DELAY)),
            RateLimitHint::RetryAfter(wait) => offset(now, wait),
            RateLimitHint::Unknown => offset(now, self.default_cooldown),
        };

        let mut reset_at = self.lock();
        let until = reset_at.map_or(until, |existing| existing.max(until));
        *reset_at = Some(until);
        until
    }

    /// Current flag value relative to the injected clock.
    pub fn status(&self) -> RateLimitStatus {
        let now = self.clock.utc();
        match *self.lock() {
            Some(until) if now < until => RateLimitStatus::Exceeded { until },
            _ => RateLimitStatus::Clear,
        }
    }

    /// Return whether the breaker currently blocks network activity.
    pub fn is_exceeded(&self) -> bool {
        self.status().is_exceeded()
    }

    /// Close the breaker after a successful search.
    pub fn clear(&self) {
        self.lock().take();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<DateTime<Utc>>> {
        self.reset_at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn offset(now: DateTime<Utc>, wait: Duration) -> DateTime<Utc> {
    // Out-of-range waits saturate rather than closing the breaker early.
    TimeDelta::from_std(wait)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
