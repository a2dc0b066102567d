//! # Jitter for restart delays.
//!
//! When many supervised processes die together (a shared dependency went away),
//! constant delays relaunch them in lockstep. [`JitterPolicy`] spreads them out.

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed restart delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact delay.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2` plus uniform in `[0, delay/2]`.
    Equal,
}

impl JitterPolicy {
    /// Applies the jitter to `delay` (millisecond granularity).
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(uniform(0, ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + uniform(0, ms - half))
            }
        }
    }
}

fn uniform(lo: u64, hi: u64) -> u64 {
    if hi <= lo {
        return lo;
    }
    rand::rng().random_range(lo..=hi)
}
