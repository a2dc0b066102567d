//! # Retry budget for a supervised process.
//!
//! [`RetryPolicy`] is the resolved (defaults applied) policy a supervision loop
//! runs with. The retry counter it governs works like a leaky budget:
//!
//! ```text
//! exit after lifetime <  recover_after  → retries += 1      (crash)
//! exit after lifetime >= recover_after  → retries -= 2, ≥ 0 (transient blip, refund)
//! retries > max_retries                 → stop relaunching
//! ```
//!
//! A service that crashes once a day therefore never exhausts its budget, while
//! one that dies on startup gives up after `max_retries + 1` launches.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Resolved retry policy of one supervision loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum retry counter value that still allows a relaunch.
    pub max_retries: u32,
    /// Minimum lifetime for an exit to count as a blip rather than a crash.
    pub recover_after: Duration,
    /// Idle delay between exit and relaunch.
    pub restart_delay: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            recover_after: Duration::from_secs(20),
            restart_delay: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// True when the loop must stop relaunching.
    #[inline]
    pub fn exhausted(&self, retries: u32) -> bool {
        retries > self.max_retries
    }

    /// New retry counter after a child lived for `lifetime`.
    #[inline]
    pub fn settle(&self, retries: u32, lifetime: Duration) -> u32 {
        if lifetime >= self.recover_after {
            retries.saturating_sub(2)
        } else {
            retries.saturating_add(1)
        }
    }

    /// Idle delay before the next launch.
    #[inline]
    pub fn delay(&self, retries: u32) -> Duration {
        self.restart_delay.next(retries)
    }
}
