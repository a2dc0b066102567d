//! # Registry configuration.
//!
//! [`Config`] centralizes the defaults injected into every
//! [`ProcessSpec`](crate::ProcessSpec) at `add` time and the runtime knobs of
//! the registry itself.
//!
//! ## Sentinel values
//! - `start_grace = 0s` → the window is derived per process as `max_retries + 3` seconds

use std::time::Duration;

use crate::policies::BackoffPolicy;
use crate::process::StopSignal;

/// Global configuration for a [`Registry`](crate::Registry).
///
/// ## Field semantics
/// - `max_retries`, `recover_after`, `restart_delay`, `stop_signal`: defaults for
///   specs that leave them unset
/// - `terminate_timeout`: how long a signaled child may take before it is killed
/// - `start_grace`: how long `start` waits for an early failure (`0s` = derived)
/// - `bus_capacity`: event ring buffer size (min 1)
/// - `capacity`: initial size of the name table
#[derive(Clone, Debug)]
pub struct Config {
    /// Default retry budget.
    pub max_retries: u32,
    /// Default recovery duration.
    pub recover_after: Duration,
    /// Default inter-restart delay.
    pub restart_delay: BackoffPolicy,
    /// Default graceful termination signal.
    pub stop_signal: StopSignal,
    /// Signal-to-kill escalation timeout.
    pub terminate_timeout: Duration,
    /// Bounded wait of `start` for an early verdict.
    pub start_grace: Duration,
    /// Capacity of the event bus.
    pub bus_capacity: usize,
    /// Expected number of processes.
    pub capacity: usize,
}

impl Config {
    /// Start grace window for a process with the given retry budget.
    #[inline]
    pub fn start_grace_for(&self, max_retries: u32) -> Duration {
        if self.start_grace.is_zero() {
            Duration::from_secs(u64::from(max_retries) + 3)
        } else {
            self.start_grace
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `max_retries = 3`
    /// - `recover_after = 20s`
    /// - `restart_delay = 500ms` constant
    /// - `stop_signal = SIGTERM`
    /// - `terminate_timeout = 3s`
    /// - `start_grace = 0s` (derived)
    /// - `bus_capacity = 1024`
    /// - `capacity = 10`
    fn default() -> Self {
        Self {
            max_retries: 3,
            recover_after: Duration::from_secs(20),
            restart_delay: BackoffPolicy::default(),
            stop_signal: StopSignal::Term,
            terminate_timeout: Duration::from_secs(3),
            start_grace: Duration::ZERO,
            bus_capacity: 1024,
            capacity: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_grace_grows_with_budget() {
        let cfg = Config::default();
        assert_eq!(cfg.start_grace_for(3), Duration::from_secs(6));
        assert_eq!(cfg.start_grace_for(0), Duration::from_secs(3));
    }

    #[test]
    fn explicit_grace_wins() {
        let cfg = Config {
            start_grace: Duration::from_millis(250),
            ..Config::default()
        };
        assert_eq!(cfg.start_grace_for(10), Duration::from_millis(250));
    }

    #[test]
    fn bus_capacity_never_zero() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
