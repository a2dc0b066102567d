//! # procvisor
//!
//! **Procvisor** is a local process supervisor for async Rust.
//!
//! It launches named child processes, restarts them when they exit on their own
//! according to a retry budget, and tears them down gracefully (signal, timeout,
//! kill) on request. The crate is the control core behind a management surface
//! such as an HTTP API; it has no global state and no wire format of its own.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ProcessSpec  │   │ ProcessSpec  │   │ ProcessSpec  │
//!     │   ("web")    │   │   ("db")     │   │  ("relay")   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼  add(name, spec) ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registry                                                         │
//! │  - RwLock<HashMap<name, Arc<Keeper>>>                             │
//! │  - Config defaults (retries, recovery, delay, stop signal)        │
//! │  - Terminate strategy (SignalThenKill / KillOnly)                 │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼ start/stop       ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Keeper    │   │    Keeper    │   │    Keeper    │
//!     │ (retry loop) │   │ (retry loop) │   │ (retry loop) │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ child process    │ child process    │ child process
//!      │                  │                  │
//!      │ Publishes: ProcessSpawned, ProcessExited, BackoffScheduled,
//!      │            RetriesExhausted, TerminateSignaled, SupervisionStopped ...
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          ┌────────┼─────────┐
//!                          ▼        ▼         ▼
//!                      LogWriter  user sub  user sub
//! ```
//!
//! ### Lifecycle of one keeper
//! ```text
//! start(args) ──► supervising = true, retries = 0
//!
//! loop {
//!   ├─► retries > max_retries?  ─► report last error, exit
//!   ├─► compute args (static list or ComputeArgs), shell-wrap if asked
//!   ├─► spawn (env merged, stdio redirected)   ─► error: report, exit
//!   ├─► publish ProcessSpawned
//!   └─► select {
//!         child exit ─► lifetime >= recover_after ? retries -= 2 : retries += 1
//!                       publish ProcessExited, sleep restart delay (stoppable)
//!         stop       ─► signal, wait ≤ timeout, kill ─► exit
//!       }
//! }
//!
//! On exit: post-stop hook ─► Idle ─► completion latch released ─► SupervisionStopped
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                            |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------------|
//! | **Registry**      | Add, remove, start, stop, restart, re-argue named processes. | [`Registry`], [`RegistryBuilder`]             |
//! | **Specs**         | Launch descriptor, env, shell, redirection, policy, hooks.   | [`ProcessSpec`], [`Redirect`], [`StopSignal`] |
//! | **Arguments**     | Per-launch argument computation, ephemeral ports.            | [`ComputeArgs`], [`ArgsFn`], [`EphemeralPort`]|
//! | **Policies**      | Retry budget with recovery refund, restart delay shaping.    | [`RetryPolicy`], [`BackoffPolicy`]            |
//! | **Termination**   | Graceful signal with forced-kill escalation.                 | [`Terminate`], [`SignalThenKill`], [`KillOnly`]|
//! | **Subscriber API**| Observe every lifecycle event; `tracing` output built in.    | [`Subscribe`], [`LogWriter`]                  |
//! | **Errors**        | Typed errors for registry calls and launches.                | [`RegistryError`], [`LaunchError`]            |
//! | **Configuration** | Defaults and runtime knobs.                                  | [`Config`]                                    |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use procvisor::{Config, LogWriter, ProcessSpec, Registry, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let registry = Registry::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let spec = ProcessSpec::new(["python3", "-m", "http.server", "8000"])
//!         .with_max_retries(5)
//!         .with_restart_delay(Duration::from_secs(1));
//!     registry.add("http", spec).await?;
//!
//!     // Returns once the start grace window passes without a failure.
//!     registry.start("http", &[]).await?;
//!     assert!(registry.running("http").await);
//!
//!     registry.stop_all_on_signal().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod process;
mod subscribers;

// ---- Public re-exports ----

#[cfg(unix)]
pub use core::SignalThenKill;
pub use core::{
    Config, KillOnly, Phase, ProcessStatus, Registry, RegistryBuilder, Terminate, Termination,
    platform_terminator, wait_for_shutdown_signal,
};
pub use error::{LaunchError, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use process::{
    ArgsFn, ArgsRef, ComputeArgs, EphemeralPort, PortTable, PostStopHook, PreStartHook,
    ProcessSpec, Redirect, StopSignal,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
