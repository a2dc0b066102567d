//! # Process definitions.
//!
//! Everything that describes *what* a supervision loop launches:
//! - [`ProcessSpec`] - launch descriptor, environment, redirection, policy, hooks
//! - [`ComputeArgs`] / [`ArgsFn`] - per-launch argument computation
//! - [`EphemeralPort`] / [`PortTable`] - free-port allocation feeding the arguments
//! - [`Redirect`] - stdin/stdout/stderr targets, reopened for every launch
//! - [`StopSignal`] - the graceful termination signal

mod args;
mod ports;
mod redirect;
mod signal;
mod spec;

pub use args::{ArgsFn, ArgsRef, ComputeArgs};
pub use ports::{EphemeralPort, PortTable};
pub use redirect::Redirect;
pub use signal::StopSignal;
pub use spec::{PostStopHook, PreStartHook, ProcessSpec};
