//! Error types used by the procvisor registry and its supervision loops.
//!
//! This module defines two enums:
//!
//! - [`RegistryError`]: failures returned by [`Registry`](crate::Registry) operations.
//! - [`LaunchError`]: failures of one supervised launch (argument computation,
//!   spawn, abnormal exit, exhausted retry budget).
//!
//! Both provide `as_label` for logs; [`LaunchError`] is carried inside
//! [`RegistryError::Launch`] when a crash loop surfaces within the start grace window.

use std::process::ExitStatus;

use thiserror::Error;

/// # Errors returned by registry operations.
///
/// Configuration problems (unknown name, name conflict, missing launch descriptor)
/// are rejected before any loop state changes. Runtime problems reach the caller
/// only through [`RegistryError::Launch`], and only while `start` is still waiting.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No process is registered under this name.
    #[error("process not found: {name}")]
    NotFound {
        /// Requested process name.
        name: String,
    },

    /// A process with this name is already registered.
    #[error("process name conflict: {name}")]
    NameConflict {
        /// Conflicting process name.
        name: String,
    },

    /// The spec has neither static arguments nor an argument computation.
    #[error("process {name} has no launch descriptor: set args or an argument computation")]
    MissingLaunch {
        /// Process name.
        name: String,
    },

    /// `update_args` was called with an empty list.
    #[error("process {name}: argument list must not be empty")]
    EmptyArgs {
        /// Process name.
        name: String,
    },

    /// The process is supervised and must be stopped first.
    #[error("process {name} is running, stop it first")]
    StillSupervising {
        /// Process name.
        name: String,
    },

    /// The process is not supervised, there is nothing to stop.
    #[error("process {name} is already stopped")]
    NotSupervising {
        /// Process name.
        name: String,
    },

    /// The pre-start hook vetoed the start.
    #[error("process {name} rejected by pre-start hook: {reason}")]
    PreStartRejected {
        /// Process name.
        name: String,
        /// Reason returned by the hook.
        reason: String,
    },

    /// The entry was removed while the caller still held it.
    #[error("process {name} has been removed")]
    Retired {
        /// Process name.
        name: String,
    },

    /// Supervision ended with an error inside the start grace window.
    #[error("process {name} failed to start: {source}")]
    Launch {
        /// Process name.
        name: String,
        /// Terminal error reported by the supervision loop.
        #[source]
        source: LaunchError,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use procvisor::RegistryError;
    ///
    /// let err = RegistryError::NotFound { name: "web".into() };
    /// assert_eq!(err.as_label(), "process_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::NotFound { .. } => "process_not_found",
            RegistryError::NameConflict { .. } => "process_name_conflict",
            RegistryError::MissingLaunch { .. } => "process_missing_launch",
            RegistryError::EmptyArgs { .. } => "process_empty_args",
            RegistryError::StillSupervising { .. } => "process_still_supervising",
            RegistryError::NotSupervising { .. } => "process_not_supervising",
            RegistryError::PreStartRejected { .. } => "process_pre_start_rejected",
            RegistryError::Retired { .. } => "process_retired",
            RegistryError::Launch { .. } => "process_launch_failed",
        }
    }

    /// Name of the process the error refers to.
    pub fn process(&self) -> &str {
        match self {
            RegistryError::NotFound { name }
            | RegistryError::NameConflict { name }
            | RegistryError::MissingLaunch { name }
            | RegistryError::EmptyArgs { name }
            | RegistryError::StillSupervising { name }
            | RegistryError::NotSupervising { name }
            | RegistryError::PreStartRejected { name, .. }
            | RegistryError::Retired { name }
            | RegistryError::Launch { name, .. } => name,
        }
    }
}

/// # Errors produced by a supervised launch.
///
/// The loop records the most recent one as its "last error". Retry-budget
/// exhaustion reports that last error; [`LaunchError::Exhausted`] is used only
/// when every exit was clean and nothing else was recorded.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The argument computation failed.
    #[error("argument computation failed: {reason}")]
    Args {
        /// Message returned by the computation.
        reason: String,
    },

    /// The OS refused to spawn the child (not found, permission denied, ...).
    #[error("spawn {program:?} failed: {source}")]
    Spawn {
        /// Program that was being launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The child exited with a non-success status.
    #[error("process exited abnormally: {status}")]
    Exit {
        /// Exit status reported by the OS.
        status: ExitStatus,
    },

    /// Waiting on the child failed.
    #[error("waiting on process failed: {source}")]
    Wait {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The retry budget ran out without any recorded failure.
    #[error("retry budget exhausted after {retries} restarts (max {max_retries})")]
    Exhausted {
        /// Retry counter value when the loop gave up.
        retries: u32,
        /// Configured maximum.
        max_retries: u32,
    },
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use procvisor::LaunchError;
    ///
    /// let err = LaunchError::Args { reason: "no port".into() };
    /// assert_eq!(err.as_label(), "launch_args_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::Args { .. } => "launch_args_failed",
            LaunchError::Spawn { .. } => "launch_spawn_failed",
            LaunchError::Exit { .. } => "launch_exit_abnormal",
            LaunchError::Wait { .. } => "launch_wait_failed",
            LaunchError::Exhausted { .. } => "launch_retries_exhausted",
        }
    }

    /// True when no child was ever created by the failing attempt.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, LaunchError::Args { .. } | LaunchError::Spawn { .. })
    }

    /// Exit code of an abnormal exit, if the child exited with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            LaunchError::Exit { status } => status.code(),
            _ => None,
        }
    }
}
