//! # Termination strategies.
//!
//! How a live child is brought down is decided once, when the registry is built,
//! by picking a [`Terminate`] implementation:
//!
//! - [`SignalThenKill`] (unix): send the configured [`StopSignal`], wait up to a
//!   timeout for the child to exit, then force-kill it.
//! - [`KillOnly`] (platforms without signal delivery): force-kill right away.
//!
//! A child that disappears between the check and the kill counts as terminated.
//! Every strategy reaps the child before returning.

use std::time::Duration;
#[cfg(unix)]
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Child;

use crate::process::StopSignal;

/// How a termination went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The child had already exited; nothing was sent.
    AlreadyExited,
    /// The child exited after the graceful signal.
    Graceful {
        /// Time between signal and exit.
        after: Duration,
    },
    /// The child ignored the signal past the timeout and was killed.
    Escalated {
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// The child was killed without a graceful attempt.
    Killed,
}

/// Strategy that terminates a live child.
#[async_trait]
pub trait Terminate: Send + Sync + 'static {
    /// Terminates and reaps `child`.
    async fn terminate(&self, child: &mut Child, signal: StopSignal) -> Termination;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Force-kills and reaps; a child that is already gone is not an error.
async fn force_kill(child: &mut Child) -> Termination {
    if child.id().is_none() {
        return Termination::AlreadyExited;
    }
    if let Err(err) = child.start_kill() {
        tracing::debug!(error = %err, "kill failed, treating child as gone");
    }
    let _ = child.wait().await;
    Termination::Killed
}

/// Signal, wait, then kill.
#[cfg(unix)]
#[derive(Clone, Copy, Debug)]
pub struct SignalThenKill {
    /// Grace given to the child after the signal.
    pub timeout: Duration,
}

#[cfg(unix)]
#[async_trait]
impl Terminate for SignalThenKill {
    async fn terminate(&self, child: &mut Child, signal: StopSignal) -> Termination {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Some(pid) = child.id() else {
            return Termination::AlreadyExited;
        };
        let Ok(raw) = i32::try_from(pid) else {
            return force_kill(child).await;
        };

        match kill(Pid::from_raw(raw), signal.to_nix()) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                let _ = child.wait().await;
                return Termination::AlreadyExited;
            }
            Err(err) => {
                tracing::warn!(pid, %signal, error = %err, "signal delivery failed, killing");
                return force_kill(child).await;
            }
        }

        let sent = Instant::now();
        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(_) => Termination::Graceful {
                after: sent.elapsed(),
            },
            Err(_elapsed) => {
                force_kill(child).await;
                Termination::Escalated {
                    timeout: self.timeout,
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "signal-then-kill"
    }
}

/// Unconditional force-kill.
#[derive(Clone, Copy, Debug, Default)]
pub struct KillOnly;

#[async_trait]
impl Terminate for KillOnly {
    async fn terminate(&self, child: &mut Child, _signal: StopSignal) -> Termination {
        force_kill(child).await
    }

    fn name(&self) -> &'static str {
        "kill-only"
    }
}

/// The strategy matching this platform's capabilities.
#[cfg(unix)]
pub fn platform_terminator(timeout: Duration) -> std::sync::Arc<dyn Terminate> {
    std::sync::Arc::new(SignalThenKill { timeout })
}

/// The strategy matching this platform's capabilities.
#[cfg(not(unix))]
pub fn platform_terminator(_timeout: Duration) -> std::sync::Arc<dyn Terminate> {
    std::sync::Arc::new(KillOnly)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::process::Command;

    #[tokio::test]
    async fn cooperative_child_exits_on_signal() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let strategy = SignalThenKill {
            timeout: Duration::from_secs(3),
        };
        let outcome = strategy.terminate(&mut child, StopSignal::Term).await;
        assert!(matches!(outcome, Termination::Graceful { after } if after < Duration::from_secs(3)));
        assert!(child.try_wait().unwrap().is_some());
    }

    #[tokio::test]
    async fn stubborn_child_is_killed_after_timeout() {
        let mut child = Command::new("sh")
            .args(["-c", "trap '' TERM; sleep 30"])
            .spawn()
            .unwrap();
        // let the shell install its trap before signaling
        tokio::time::sleep(Duration::from_millis(200)).await;

        let strategy = SignalThenKill {
            timeout: Duration::from_millis(300),
        };
        let started = std::time::Instant::now();
        let outcome = strategy.terminate(&mut child, StopSignal::Term).await;
        assert_eq!(
            outcome,
            Termination::Escalated {
                timeout: Duration::from_millis(300)
            }
        );
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn already_reaped_child_is_not_an_error() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().await.unwrap();
        assert_eq!(
            KillOnly.terminate(&mut child, StopSignal::Term).await,
            Termination::AlreadyExited
        );
        let strategy = SignalThenKill {
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            strategy.terminate(&mut child, StopSignal::Term).await,
            Termination::AlreadyExited
        );
    }
}
