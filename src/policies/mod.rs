//! Retry and restart-delay policies.
//!
//! These are the knobs that decide **whether** a supervised process is
//! launched again and **how long** the loop idles before it does.
//!
//! ## Contents
//! - [`RetryPolicy`]   retry budget and the recovery-duration refund
//! - [`BackoffPolicy`] inter-restart delay (constant by default, optionally growing)
//! - [`JitterPolicy`]  randomization of the delay
//!
//! ## Quick wiring
//! ```text
//! ProcessSpec { max_retries, recover_after, restart_delay } ─► Config defaults fill the gaps
//!      └─► core::keeper uses:
//!           - retry.exhausted(retries) to stop relaunching
//!           - retry.settle(retries, lifetime) after every exit
//!           - retry.delay(retries) for the idle sleep between launches
//! ```
//!
//! ## Defaults
//! - `max_retries = 3`, `recover_after = 20s`.
//! - `BackoffPolicy::default()` → constant 500ms, jitter none.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
