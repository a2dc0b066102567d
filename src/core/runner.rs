//! # Spawn one child of a supervised process.
//!
//! Turns a [`ProcessSpec`] plus the start arguments into a live
//! [`tokio::process::Child`], and classifies how that child ended.
//!
//! ## Flow
//! ```text
//! spec.command_line(start_args) ──► [program, args...] ──► Command
//!                                                            ├─ envs (merged over ours)
//!                                                            ├─ stdin/stdout/stderr (re-opened)
//!                                                            └─ kill_on_drop
//! ```
//!
//! ## Rules
//! - An empty argument vector is a spawn failure (`InvalidInput`), never a panic.
//! - Redirection files are opened per launch; an open failure is a spawn failure.
//! - Exit status 0 is not an error; any other status is [`LaunchError::Exit`].

use std::io;
use std::process::ExitStatus;

use tokio::process::{Child, Command};

use crate::error::LaunchError;
use crate::process::ProcessSpec;

/// Spawns one child for `spec`.
///
/// Returns the child and its argument line (space-joined, for events).
pub(crate) fn launch(
    spec: &ProcessSpec,
    start_args: &[String],
) -> Result<(Child, String), LaunchError> {
    let argv = spec.command_line(start_args)?;
    let argline = argv.join(" ");

    let Some((program, rest)) = argv.split_first() else {
        return Err(LaunchError::Spawn {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty argument list"),
        });
    };

    let spawn_err = |source: io::Error| LaunchError::Spawn {
        program: program.clone(),
        source,
    };

    let mut cmd = Command::new(program);
    cmd.args(rest)
        .envs(spec.env().iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(spec.stdin().input().map_err(spawn_err)?)
        .stdout(spec.stdout().output().map_err(spawn_err)?)
        .stderr(spec.stderr().output().map_err(spawn_err)?)
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(spawn_err)?;
    Ok((child, argline))
}

/// Error recorded for a child that ended on its own, if it ended badly.
pub(crate) fn exit_error(res: io::Result<ExitStatus>) -> Option<LaunchError> {
    match res {
        Ok(status) if status.success() => None,
        Ok(status) => Some(LaunchError::Exit { status }),
        Err(source) => Some(LaunchError::Wait { source }),
    }
}
