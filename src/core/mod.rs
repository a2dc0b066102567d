//! Runtime core: supervision loops and the registry that owns them.
//!
//! The public entry point is [`Registry`]; everything else here supports it.
//!
//! Internal modules:
//! - [`config`]: defaults injected into specs and runtime knobs;
//! - [`builder`]: wires bus, subscribers and the termination strategy;
//! - [`registry`]: name-keyed map of keepers, lifecycle delegation;
//! - [`keeper`]: the per-process supervision loop (state machine, retries);
//! - [`runner`]: spawns one child and classifies its exit;
//! - [`terminate`]: graceful-then-forced termination strategies;
//! - [`status`]: read-only snapshots of a keeper;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod config;
mod keeper;
mod registry;
mod runner;
mod shutdown;
mod status;
mod terminate;

pub use builder::RegistryBuilder;
pub use config::Config;
pub use registry::Registry;
pub use shutdown::wait_for_shutdown_signal;
pub use status::{Phase, ProcessStatus};
#[cfg(unix)]
pub use terminate::SignalThenKill;
pub use terminate::{KillOnly, Terminate, Termination, platform_terminator};
