//! # Keeper: the supervision loop of one named process.
//!
//! A [`Keeper`] owns the state of one registered process and, while supervised,
//! one tokio task running the loop below. Only the pid is shared; the
//! [`tokio::process::Child`] itself never leaves the loop task.
//!
//! ## Loop
//! ```text
//! start ──► ┌───────────────────────────────────────────────────────────┐
//!           │ retries > max?        ── yes ──► teardown(last error)     │
//!           │ stop pending?         ── yes ──► teardown               │
//!           │ launch                ── err ──► teardown(launch error)   │
//!           │ select {                                                  │
//!           │   child exits  → settle retries, publish, backoff ───────┘ (loop)
//!           │   stop request → terminate child ──► teardown
//!           │ }
//!           └──────────────────────────────────────────────────────────
//!
//! teardown: post-stop hook → Idle (pid, running, supervising cleared)
//!           → release latch → SupervisionStopped → report terminal error
//! ```
//!
//! ## Rules
//! - `running` implies `supervising`; at most one live child per keeper.
//! - A second `start` while supervising is ignored (event only).
//! - The stop slot holds one request; extra requests are dropped.
//! - The completion latch is fresh per cycle and released exactly once.
//! - The post-stop hook runs exactly once per cycle on the blocking pool, before
//!   the latch is released.
//! - Dropping the owning registry stops the loop like a stop request.

use std::sync::Arc;
use std::time::Instant;

use tokio::process::Child;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::core::runner;
use crate::core::status::{Phase, ProcessStatus};
use crate::core::terminate::{Terminate, Termination};
use crate::error::{LaunchError, RegistryError};
use crate::events::{Bus, Event, EventKind};
use crate::process::{ProcessSpec, StopSignal};

/// Mutable state of one keeper, guarded by its own mutex.
struct State {
    spec: Arc<ProcessSpec>,
    pid: Option<u32>,
    retries: u32,
    running: bool,
    supervising: bool,
    phase: Phase,
    started_at: Option<Instant>,
    last_error: Option<String>,
    stop_tx: Option<mpsc::Sender<()>>,
    done: Option<CancellationToken>,
    retired: bool,
}

/// Supervisor of one registered process.
pub(crate) struct Keeper {
    name: Arc<str>,
    state: Mutex<State>,
    bus: Bus,
    terminator: Arc<dyn Terminate>,
    runtime: CancellationToken,
}

impl Keeper {
    pub(crate) fn new(
        name: impl Into<Arc<str>>,
        spec: ProcessSpec,
        bus: Bus,
        terminator: Arc<dyn Terminate>,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(State {
                spec: Arc::new(spec),
                pid: None,
                retries: 0,
                running: false,
                supervising: false,
                phase: Phase::Idle,
                started_at: None,
                last_error: None,
                stop_tx: None,
                done: None,
                retired: false,
            }),
            bus,
            terminator,
            runtime,
        }
    }

    /// Begins a supervision cycle.
    ///
    /// Returns the receiver of the cycle's terminal error, or `None` when the
    /// keeper was already supervising and the call was ignored.
    pub(crate) async fn start(
        self: &Arc<Self>,
        start_args: Vec<String>,
    ) -> Result<Option<oneshot::Receiver<LaunchError>>, RegistryError> {
        let (spec, stop_rx, done, report_tx, report_rx) = {
            let mut st = self.state.lock().await;
            if st.retired {
                return Err(RegistryError::Retired {
                    name: self.name.to_string(),
                });
            }
            if st.supervising {
                drop(st);
                self.publish(Event::new(EventKind::StartIgnored));
                return Ok(None);
            }

            let (stop_tx, stop_rx) = mpsc::channel(1);
            let (report_tx, report_rx) = oneshot::channel();
            let done = CancellationToken::new();

            st.supervising = true;
            st.retries = 0;
            st.last_error = None;
            st.phase = Phase::Launching;
            st.stop_tx = Some(stop_tx);
            st.done = Some(done.clone());
            (Arc::clone(&st.spec), stop_rx, done, report_tx, report_rx)
        };

        self.publish(Event::new(EventKind::SupervisionStarted));

        let me = Arc::clone(self);
        tokio::spawn(async move {
            me.run(spec, start_args, stop_rx, done, report_tx).await;
        });
        Ok(Some(report_rx))
    }

    /// Requests the end of the current cycle, optionally waiting for teardown.
    pub(crate) async fn stop(&self, wait: bool) -> Result<(), RegistryError> {
        let (stop_tx, done) = {
            let st = self.state.lock().await;
            if !st.supervising {
                return Err(RegistryError::NotSupervising {
                    name: self.name.to_string(),
                });
            }
            (st.stop_tx.clone(), st.done.clone())
        };

        self.publish(Event::new(EventKind::StopRequested));
        if let Some(tx) = stop_tx {
            // a full slot already carries a stop request
            let _ = tx.try_send(());
        }
        if wait && let Some(done) = done {
            done.cancelled().await;
        }
        Ok(())
    }

    /// True while a supervision cycle is active.
    pub(crate) async fn supervising(&self) -> bool {
        self.state.lock().await.supervising
    }

    /// Marks the keeper as removed; refuses while supervising.
    pub(crate) async fn retire(&self) -> Result<(), RegistryError> {
        let mut st = self.state.lock().await;
        if st.supervising {
            return Err(RegistryError::StillSupervising {
                name: self.name.to_string(),
            });
        }
        st.retired = true;
        Ok(())
    }

    /// Replaces the static argument list; returns whether the keeper is supervising.
    pub(crate) async fn replace_args(&self, args: Vec<String>) -> bool {
        let mut st = self.state.lock().await;
        Arc::make_mut(&mut st.spec).set_args(args);
        st.supervising
    }

    /// Current spec.
    pub(crate) async fn spec(&self) -> Arc<ProcessSpec> {
        Arc::clone(&self.state.lock().await.spec)
    }

    /// Point-in-time snapshot.
    pub(crate) async fn status(&self) -> ProcessStatus {
        let st = self.state.lock().await;
        ProcessStatus {
            name: self.name.to_string(),
            phase: st.phase,
            supervising: st.supervising,
            running: st.running,
            pid: st.pid,
            retries: st.retries,
            uptime: st.started_at.map(|t| t.elapsed()),
            last_error: st.last_error.clone(),
        }
    }

    async fn run(
        self: Arc<Self>,
        spec: Arc<ProcessSpec>,
        start_args: Vec<String>,
        mut stop_rx: mpsc::Receiver<()>,
        done: CancellationToken,
        report: oneshot::Sender<LaunchError>,
    ) {
        let policy = spec.retry_policy();
        let signal = spec.stop_signal().unwrap_or_default();
        let mut last: Option<LaunchError> = None;
        let mut attempt: u32 = 0;

        let terminal = loop {
            let retries = self.state.lock().await.retries;
            if policy.exhausted(retries) {
                let mut ev = Event::new(EventKind::RetriesExhausted).with_retries(retries);
                if let Some(err) = &last {
                    ev = ev.with_reason(err.to_string());
                }
                self.publish(ev);
                break Some(last.take().unwrap_or(LaunchError::Exhausted {
                    retries,
                    max_retries: policy.max_retries,
                }));
            }
            if stop_rx.try_recv().is_ok() || self.runtime.is_cancelled() {
                break None;
            }

            self.state.lock().await.phase = Phase::Launching;
            attempt = attempt.saturating_add(1);

            let (mut child, argline) = match runner::launch(&spec, &start_args) {
                Ok(spawned) => spawned,
                Err(err) => {
                    self.state.lock().await.last_error = Some(err.to_string());
                    self.publish(
                        Event::new(EventKind::LaunchFailed)
                            .with_attempt(attempt)
                            .with_reason(err.to_string()),
                    );
                    break Some(err);
                }
            };

            let pid = child.id();
            let launched = Instant::now();
            {
                let mut st = self.state.lock().await;
                st.pid = pid;
                st.running = true;
                st.phase = Phase::Running;
                st.started_at = Some(launched);
            }
            let mut ev = Event::new(EventKind::ProcessSpawned)
                .with_attempt(attempt)
                .with_retries(retries)
                .with_reason(argline);
            if let Some(pid) = pid {
                ev = ev.with_pid(pid);
            }
            self.publish(ev);

            tokio::select! {
                res = child.wait() => {
                    let lifetime = launched.elapsed();
                    let err = runner::exit_error(res);
                    let reason = err
                        .as_ref()
                        .map_or_else(|| "exit status: 0".to_string(), ToString::to_string);

                    let retries = {
                        let mut st = self.state.lock().await;
                        st.retries = policy.settle(st.retries, lifetime);
                        st.running = false;
                        st.pid = None;
                        st.started_at = None;
                        if err.is_some() {
                            st.last_error = Some(reason.clone());
                        }
                        st.retries
                    };

                    let mut ev = Event::new(EventKind::ProcessExited)
                        .with_retries(retries)
                        .with_uptime(lifetime)
                        .with_reason(reason);
                    if let Some(pid) = pid {
                        ev = ev.with_pid(pid);
                    }
                    self.publish(ev);

                    if let Some(err) = err {
                        last = Some(err);
                    }
                    if policy.exhausted(retries) {
                        continue;
                    }

                    let delay = policy.delay(retries);
                    self.state.lock().await.phase = Phase::Backoff;
                    self.publish(
                        Event::new(EventKind::BackoffScheduled)
                            .with_retries(retries)
                            .with_delay(delay),
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.stop_requested(&mut stop_rx) => break None,
                    }
                }
                _ = self.stop_requested(&mut stop_rx) => {
                    self.state.lock().await.phase = Phase::Terminating;
                    self.terminate(&mut child, pid, signal).await;
                    break None;
                }
            }
        };

        self.teardown(spec, terminal, done, report).await;
    }

    /// Resolves on a stop request or once the owning registry is gone.
    async fn stop_requested(&self, stop_rx: &mut mpsc::Receiver<()>) {
        tokio::select! {
            _ = stop_rx.recv() => {}
            _ = self.runtime.cancelled() => {}
        }
    }

    async fn terminate(&self, child: &mut Child, pid: Option<u32>, signal: StopSignal) {
        let outcome = self.terminator.terminate(child, signal).await;
        tracing::debug!(
            process = %self.name,
            strategy = self.terminator.name(),
            ?outcome,
            "child terminated"
        );

        let with_pid = |ev: Event| match pid {
            Some(pid) => ev.with_pid(pid),
            None => ev,
        };
        match outcome {
            Termination::AlreadyExited => {}
            Termination::Graceful { .. } => {
                self.publish(with_pid(
                    Event::new(EventKind::TerminateSignaled).with_reason(signal.as_str()),
                ));
            }
            Termination::Escalated { timeout } => {
                self.publish(with_pid(
                    Event::new(EventKind::TerminateSignaled).with_reason(signal.as_str()),
                ));
                self.publish(with_pid(
                    Event::new(EventKind::TerminateEscalated).with_timeout(timeout),
                ));
            }
            Termination::Killed => {
                self.publish(with_pid(
                    Event::new(EventKind::TerminateSignaled).with_reason(StopSignal::Kill.as_str()),
                ));
            }
        }
    }

    async fn teardown(
        &self,
        spec: Arc<ProcessSpec>,
        terminal: Option<LaunchError>,
        done: CancellationToken,
        report: oneshot::Sender<LaunchError>,
    ) {
        // hooks may block (process sweeps), keep them off the async workers
        if let Some(hook) = spec.post_stop().cloned() {
            let spec = Arc::clone(&spec);
            if let Err(err) = tokio::task::spawn_blocking(move || hook(&*spec)).await
                && err.is_panic()
            {
                tracing::warn!(process = %self.name, "post-stop hook panicked");
            }
        }

        let retries = {
            let mut st = self.state.lock().await;
            st.pid = None;
            st.running = false;
            st.supervising = false;
            st.phase = Phase::Idle;
            st.started_at = None;
            st.stop_tx = None;
            st.done = None;
            if let Some(err) = &terminal {
                st.last_error = Some(err.to_string());
            }
            st.retries
        };
        done.cancel();

        let mut ev = Event::new(EventKind::SupervisionStopped).with_retries(retries);
        if let Some(err) = &terminal {
            ev = ev.with_reason(err.to_string());
        }
        self.publish(ev);

        if let Some(err) = terminal {
            // the start caller may have stopped waiting
            let _ = report.send(err);
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_process(Arc::clone(&self.name)));
    }
}
