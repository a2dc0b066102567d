//! Read-only snapshots of a supervised process.

use std::time::Duration;

/// Where a supervision loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    /// Not supervised.
    #[default]
    Idle,
    /// Computing arguments and spawning.
    Launching,
    /// A child is alive.
    Running,
    /// Waiting out the restart delay.
    Backoff,
    /// Bringing the child down after a stop request.
    Terminating,
}

impl Phase {
    /// Lowercase name, for logs and status pages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Launching => "launching",
            Phase::Running => "running",
            Phase::Backoff => "backoff",
            Phase::Terminating => "terminating",
        }
    }
}

/// Point-in-time view of one registered process.
#[derive(Clone, Debug)]
pub struct ProcessStatus {
    /// Registry name.
    pub name: String,
    /// Loop phase.
    pub phase: Phase,
    /// Supervision loop active.
    pub supervising: bool,
    /// A child is alive right now.
    pub running: bool,
    /// Pid of the live child.
    pub pid: Option<u32>,
    /// Retry counter.
    pub retries: u32,
    /// Lifetime of the live child.
    pub uptime: Option<Duration>,
    /// Most recent launch or exit error.
    pub last_error: Option<String>,
}
