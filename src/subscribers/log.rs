//! # LogWriter: events as structured `tracing` records
//!
//! Renders every supervision event through `tracing`, so the host application
//! decides formatting and filtering with its own subscriber (`tracing-subscriber`,
//! journald, ...). Target is `procvisor`.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO procvisor: process spawned process="web" pid=4242 attempt=1 retries=0
//! WARN procvisor: process exited process="web" pid=4242 retries=1 uptime_ms=12 reason="exit status: 3"
//! INFO procvisor: restart scheduled process="web" retries=1 delay_ms=500
//! ERROR procvisor: retry budget exhausted process="web" retries=4
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs events with `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let process = e.process.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ProcessAdded => {
                tracing::info!(target: "procvisor", process, "process added");
            }
            EventKind::ProcessRemoved => {
                tracing::info!(target: "procvisor", process, "process removed");
            }
            EventKind::ArgsUpdated => {
                tracing::info!(target: "procvisor", process, args = reason, "arguments updated");
            }
            EventKind::SupervisionStarted => {
                tracing::info!(target: "procvisor", process, "supervision started");
            }
            EventKind::StartIgnored => {
                tracing::warn!(target: "procvisor", process, "already supervised, start ignored");
            }
            EventKind::ProcessSpawned => {
                tracing::info!(
                    target: "procvisor",
                    process,
                    pid = e.pid,
                    attempt = e.attempt,
                    retries = e.retries,
                    args = reason,
                    "process spawned"
                );
            }
            EventKind::LaunchFailed => {
                tracing::error!(target: "procvisor", process, attempt = e.attempt, reason, "launch failed");
            }
            EventKind::ProcessExited => {
                tracing::warn!(
                    target: "procvisor",
                    process,
                    pid = e.pid,
                    retries = e.retries,
                    uptime_ms = e.uptime_ms,
                    reason,
                    "process exited"
                );
            }
            EventKind::BackoffScheduled => {
                tracing::info!(
                    target: "procvisor",
                    process,
                    retries = e.retries,
                    delay_ms = e.delay_ms,
                    "restart scheduled"
                );
            }
            EventKind::RetriesExhausted => {
                tracing::error!(target: "procvisor", process, retries = e.retries, reason, "retry budget exhausted");
            }
            EventKind::StopRequested => {
                tracing::info!(target: "procvisor", process, "stop requested");
            }
            EventKind::TerminateSignaled => {
                tracing::info!(target: "procvisor", process, pid = e.pid, signal = reason, "termination signal sent");
            }
            EventKind::TerminateEscalated => {
                tracing::warn!(
                    target: "procvisor",
                    process,
                    pid = e.pid,
                    timeout_ms = e.timeout_ms,
                    "termination timed out, process killed"
                );
            }
            EventKind::SupervisionStopped => {
                tracing::info!(target: "procvisor", process, retries = e.retries, reason, "supervision stopped");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "procvisor", "shutdown requested");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "procvisor", subscriber = process, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "procvisor", subscriber = process, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
