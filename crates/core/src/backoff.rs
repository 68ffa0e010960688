// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry policy shared by the readiness waiter and the allocator's re-scan
//!
//! A [`RetryPolicy`] describes the delay schedule; [`Backoff`] is one run of
//! that schedule bounded by a deadline. Time is read from the tokio clock so
//! paused-time tests drive it deterministically.

use std::time::Duration;
use tokio::time::Instant;

/// Delay schedule: start at `initial`, multiply by `multiplier` after every
/// attempt, never exceed `cap`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub multiplier: u32,
    pub cap: Duration,
}

impl RetryPolicy {
    /// Doubling delays from `initial` up to `cap`
    pub const fn exponential(initial: Duration, cap: Duration) -> Self {
        Self {
            initial,
            multiplier: 2,
            cap,
        }
    }

    /// Constant delay between attempts
    pub const fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            multiplier: 1,
            cap: interval,
        }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Begin a run of this schedule that ends at `deadline`
    pub fn start(&self, deadline: Instant) -> Backoff {
        Backoff {
            policy: *self,
            current: self.initial.min(self.cap),
            deadline,
        }
    }
}

impl Default for RetryPolicy {
    /// 50ms doubling up to 1s, the readiness polling schedule
    fn default() -> Self {
        Self::exponential(Duration::from_millis(50), Duration::from_secs(1))
    }
}

/// Horizon used when `start + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `start + timeout`, saturating instead of overflowing for huge timeouts
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// One deadline-bounded run of a [`RetryPolicy`]
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    current: Duration,
    deadline: Instant,
}

impl Backoff {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Delay before the next attempt, clamped so it never runs past the
    /// deadline. Returns `None` once the deadline has been reached.
    pub fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        if self.is_expired(now) {
            return None;
        }
        let delay = self.current.min(self.deadline - now);
        self.current = self
            .current
            .saturating_mul(self.policy.multiplier.max(1))
            .min(self.policy.cap);
        Some(delay)
    }

    /// Sleep for the next delay. Returns `false` without sleeping once the
    /// deadline has been reached.
    pub async fn wait(&mut self) -> bool {
        match self.next_delay(Instant::now()) {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
