//! # Events emitted by the registry and the supervision loops.
//!
//! [`EventKind`] covers three groups:
//! - **Registry events**: a process definition was added, removed or re-argued
//! - **Loop events**: the life of one supervised child (spawn, exit, backoff, stop)
//! - **Runtime events**: subscriber health and shutdown
//!
//! [`Event`] carries a global sequence number, a timestamp, and the optional
//! metadata relevant to its kind.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ProcessExited)
//!     .with_process("web")
//!     .with_pid(4242)
//!     .with_retries(1)
//!     .with_uptime(Duration::from_millis(1500))
//!     .with_reason("exit status: 1");
//!
//! assert_eq!(ev.process.as_deref(), Some("web"));
//! assert_eq!(ev.uptime_ms, Some(1500));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervision events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A process definition was registered.
    ///
    /// Sets: `process`
    ProcessAdded,

    /// A process definition was unregistered.
    ///
    /// Sets: `process`
    ProcessRemoved,

    /// The static argument list was replaced.
    ///
    /// Sets: `process`, `reason` (new arguments, space-joined)
    ArgsUpdated,

    // === Loop events ===
    /// Supervision began (Idle → Launching).
    ///
    /// Sets: `process`
    SupervisionStarted,

    /// `start` arrived while the process was already supervised; ignored.
    ///
    /// Sets: `process`
    StartIgnored,

    /// A child was spawned.
    ///
    /// Sets: `process`, `pid`, `attempt` (1-based launch count in this cycle),
    /// `retries`, `reason` (argument line)
    ProcessSpawned,

    /// Argument computation or spawn failed; supervision ends.
    ///
    /// Sets: `process`, `attempt`, `reason`
    LaunchFailed,

    /// A child exited on its own.
    ///
    /// Sets: `process`, `pid`, `retries` (after settling), `uptime_ms`,
    /// `reason` (exit status or wait error)
    ProcessExited,

    /// The loop is idling before the next launch.
    ///
    /// Sets: `process`, `retries`, `delay_ms`
    BackoffScheduled,

    /// The retry budget is spent; supervision ends.
    ///
    /// Sets: `process`, `retries`, `reason` (last error, if any)
    RetriesExhausted,

    /// A stop request was delivered (or found the slot already full).
    ///
    /// Sets: `process`
    StopRequested,

    /// The graceful signal was sent to a live child.
    ///
    /// Sets: `process`, `pid`, `reason` (signal name)
    TerminateSignaled,

    /// The child outlived the termination timeout and was force-killed.
    ///
    /// Sets: `process`, `pid`, `timeout_ms`
    TerminateEscalated,

    /// The loop fully tore down (Idle). Emitted exactly once per cycle.
    ///
    /// Sets: `process`, `retries`, `reason` (terminal error, if any)
    SupervisionStopped,

    // === Runtime events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `process` (subscriber name), `reason`
    SubscriberOverflow,

    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `process` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Supervision event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Registry name of the process (or subscriber name for subscriber events).
    pub process: Option<Arc<str>>,
    /// OS pid of the child.
    pub pid: Option<u32>,
    /// Launch count within the current supervision cycle (1-based).
    pub attempt: Option<u32>,
    /// Retry counter value.
    pub retries: Option<u32>,
    /// Idle delay before the next launch, in milliseconds.
    pub delay_ms: Option<u32>,
    /// Lifetime of the exited child, in milliseconds.
    pub uptime_ms: Option<u64>,
    /// Termination timeout that elapsed, in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Human-readable detail (errors, arguments, signal names).
    pub reason: Option<Arc<str>>,
}

fn millis_u32(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

impl Event {
    /// Creates an event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            process: None,
            pid: None,
            attempt: None,
            retries: None,
            delay_ms: None,
            uptime_ms: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches the process name.
    #[inline]
    pub fn with_process(mut self, name: impl Into<Arc<str>>) -> Self {
        self.process = Some(name.into());
        self
    }

    /// Attaches the child pid.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches the launch count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches the retry counter.
    #[inline]
    pub fn with_retries(mut self, n: u32) -> Self {
        self.retries = Some(n);
        self
    }

    /// Attaches the idle delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis_u32(d));
        self
    }

    /// Attaches the child lifetime (stored as milliseconds).
    #[inline]
    pub fn with_uptime(mut self, d: Duration) -> Self {
        self.uptime_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches the termination timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis_u32(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_process(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_process(subscriber)
            .with_reason(info)
    }

    /// True for events that describe a supervised process (not the runtime).
    pub fn is_process_event(&self) -> bool {
        !matches!(
            self.kind,
            EventKind::ShutdownRequested
                | EventKind::SubscriberOverflow
                | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ProcessAdded);
        let b = Event::new(EventKind::ProcessAdded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn oversized_delay_saturates() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn subscriber_events_are_not_process_events() {
        assert!(!Event::subscriber_overflow("log", "full").is_process_event());
        assert!(Event::new(EventKind::StopRequested).is_process_event());
    }
}
