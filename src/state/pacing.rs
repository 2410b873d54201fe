//! Crawl-wide request pacing
//!
//! One gate is shared by every worker. Each caller reserves the next free
//! start slot under a short lock, releases the lock, and then sleeps until
//! its slot. Consecutive request starts are therefore at least `interval`
//! apart no matter how many workers contend.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Longest spacing a gate will enforce
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shared pacing gate enforcing a minimum spacing between request starts
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateGate {
    /// Creates a gate with the given minimum spacing, capped at [`MAX_INTERVAL`]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.min(MAX_INTERVAL),
            next_slot: Mutex::new(None),
        }
    }

    /// Creates a gate from a spacing expressed in (fractional) seconds
    ///
    /// Non-finite or negative values disable pacing. Values too large for a
    /// `Duration` are capped like any other oversized spacing.
    pub fn from_secs_f64(secs: f64) -> Self {
        let interval = if secs.is_finite() && secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(MAX_INTERVAL)
        } else {
            Duration::ZERO
        };
        Self::new(interval)
    }

    /// Returns the configured minimum spacing
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for this caller's turn to start a request
    ///
    /// Returns `false` if `cancel` fires before the slot arrives; the caller
    /// must then not issue the request.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }
        if self.interval.is_zero() {
            return true;
        }

        let slot = self.reserve();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = sleep_until(slot) => true,
        }
    }

    /// Claims the earliest free slot and pushes the next one forward
    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = match self.next_slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let slot = match *next {
            Some(reserved) if reserved > now => reserved,
            _ => now,
        };
        *next = Some(slot.checked_add(self.interval).unwrap_or(slot));
        slot
    }
}
