//! # Delay between a child's exit and its next launch.
//!
//! [`BackoffPolicy`] maps the current retry counter to the idle delay the
//! supervision loop waits before relaunching. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay at retry 0;
//! - [`BackoffPolicy::factor`] the multiplicative growth per retry;
//! - [`BackoffPolicy::max`] the cap.
//!
//! With the default `factor = 1.0` the delay is constant, which is the classic
//! "wait N ms, then restart" behavior. A factor above 1.0 makes a crash loop back
//! off harder the closer it gets to its retry budget.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{BackoffPolicy, JitterPolicy};
//!
//! let constant = BackoffPolicy::constant(Duration::from_millis(500));
//! assert_eq!(constant.next(0), Duration::from_millis(500));
//! assert_eq!(constant.next(3), Duration::from_millis(500));
//!
//! let growing = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(2),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//! assert_eq!(growing.next(2), Duration::from_millis(400));
//! assert_eq!(growing.next(10), Duration::from_secs(2));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Inter-restart delay policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay used while the retry counter is 0.
    pub first: Duration,
    /// Upper bound for any computed delay.
    pub max: Duration,
    /// Growth factor per retry (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied after capping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 500ms, no jitter, capped at 30s.
    fn default() -> Self {
        Self::constant(Duration::from_millis(500))
    }
}

impl BackoffPolicy {
    /// A fixed delay that does not depend on the retry counter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay.max(Duration::from_secs(30)),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given retry counter.
    ///
    /// The base is `first × factor^retries`, clamped to `max`; jitter is applied
    /// to the clamped base. Non-finite or negative intermediates fall back to `max`.
    pub fn next(&self, retries: u32) -> Duration {
        let exp = retries.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };
        self.jitter.apply(base)
    }
}
