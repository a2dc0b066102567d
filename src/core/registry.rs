//! # Registry: name-keyed table of supervised processes.
//!
//! The [`Registry`] is the public face of the crate. It validates and stores
//! [`ProcessSpec`]s under unique names, injects [`Config`] defaults, and
//! delegates lifecycle operations to one keeper per name.
//!
//! ## Architecture
//! ```text
//! caller ──► Registry ──► RwLock<HashMap<String, Arc<Keeper>>>
//!              │                         │
//!              │ (table lock released)   ▼
//!              └───────────────────► Keeper (own Mutex) ──► supervision task
//!                                        │
//!                                        └──► Bus ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - `add`/`remove` take the write lock; everything else takes the read lock.
//! - The table lock is never held while a keeper lock is taken: keepers are
//!   cloned out of the table first.
//! - `remove` retires the keeper (refused while supervising), then drops the entry.
//! - `start` waits for an early verdict at most for the start grace window;
//!   supervision continues in the background afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::core::builder::RegistryBuilder;
use crate::core::keeper::Keeper;
use crate::core::shutdown::wait_for_shutdown_signal;
use crate::core::status::ProcessStatus;
use crate::core::terminate::Terminate;
use crate::core::Config;
use crate::error::RegistryError;
use crate::events::{Bus, Event, EventKind};
use crate::process::ProcessSpec;

/// Concurrent table of named, supervised processes.
///
/// Dropping the registry ends every supervision loop it started: live children
/// are terminated as on [`stop`](Registry::stop), without waiting.
pub struct Registry {
    cfg: Config,
    keepers: RwLock<HashMap<String, Arc<Keeper>>>,
    bus: Bus,
    terminator: Arc<dyn Terminate>,
    runtime: CancellationToken,
}

impl Registry {
    /// Starts building a registry.
    pub fn builder(cfg: Config) -> RegistryBuilder {
        RegistryBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        terminator: Arc<dyn Terminate>,
        runtime: CancellationToken,
    ) -> Self {
        Self {
            keepers: RwLock::new(HashMap::with_capacity(cfg.capacity)),
            cfg,
            bus,
            terminator,
            runtime,
        }
    }

    /// Event bus every keeper publishes to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registry configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// True if `name` is registered.
    pub async fn exists(&self, name: &str) -> bool {
        self.keepers.read().await.contains_key(name)
    }

    /// Registers `spec` under `name`, filling unset policy fields from [`Config`].
    pub async fn add(&self, name: &str, mut spec: ProcessSpec) -> Result<(), RegistryError> {
        if !spec.has_launch() {
            return Err(RegistryError::MissingLaunch {
                name: name.to_string(),
            });
        }
        spec.fill_defaults(&self.cfg);

        {
            let mut keepers = self.keepers.write().await;
            if keepers.contains_key(name) {
                return Err(RegistryError::NameConflict {
                    name: name.to_string(),
                });
            }
            let keeper = Keeper::new(
                name,
                spec,
                self.bus.clone(),
                Arc::clone(&self.terminator),
                self.runtime.clone(),
            );
            keepers.insert(name.to_string(), Arc::new(keeper));
        }

        self.bus
            .publish(Event::new(EventKind::ProcessAdded).with_process(name));
        Ok(())
    }

    /// Unregisters `name`; refused while it is supervised.
    pub async fn remove(&self, name: &str) -> Result<(), RegistryError> {
        let keeper = self.get(name).await?;
        keeper.retire().await?;

        {
            let mut keepers = self.keepers.write().await;
            // the slot may have been removed and re-added meanwhile
            if keepers
                .get(name)
                .is_some_and(|current| Arc::ptr_eq(current, &keeper))
            {
                keepers.remove(name);
            } else {
                return Err(RegistryError::NotFound {
                    name: name.to_string(),
                });
            }
        }

        self.bus
            .publish(Event::new(EventKind::ProcessRemoved).with_process(name));
        Ok(())
    }

    /// Starts supervising `name`.
    ///
    /// Runs the pre-start hook first; a veto is returned as
    /// [`RegistryError::PreStartRejected`]. Then waits up to the start grace
    /// window for the loop to fail. A failure inside the window is returned as
    /// [`RegistryError::Launch`]; otherwise the call succeeds and supervision
    /// continues in the background. Starting a supervised process is a no-op.
    pub async fn start(&self, name: &str, args: &[String]) -> Result<(), RegistryError> {
        let keeper = self.get(name).await?;
        let spec = keeper.spec().await;

        if let Some(hook) = spec.pre_start() {
            hook(&*spec).map_err(|reason| RegistryError::PreStartRejected {
                name: name.to_string(),
                reason,
            })?;
        }

        let Some(report) = keeper.start(args.to_vec()).await? else {
            return Ok(());
        };

        let grace = self
            .cfg
            .start_grace_for(spec.max_retries().unwrap_or(self.cfg.max_retries));
        match tokio::time::timeout(grace, report).await {
            Ok(Ok(source)) => Err(RegistryError::Launch {
                name: name.to_string(),
                source,
            }),
            // loop ended cleanly (sender dropped) or still running
            Ok(Err(_)) | Err(_) => Ok(()),
        }
    }

    /// Requests `name` to stop; with `wait`, returns after teardown completed.
    pub async fn stop(&self, name: &str, wait: bool) -> Result<(), RegistryError> {
        self.get(name).await?.stop(wait).await
    }

    /// Stops every supervised process and waits for all of them.
    pub async fn stop_all(&self) {
        let keepers: Vec<Arc<Keeper>> = self.keepers.read().await.values().cloned().collect();
        let stops = keepers.iter().map(|k| async move {
            // idle keepers report NotSupervising
            let _ = k.stop(true).await;
        });
        join_all(stops).await;
    }

    /// Stops `name` (waiting for teardown) and starts it again without extra arguments.
    pub async fn restart(&self, name: &str) -> Result<(), RegistryError> {
        match self.stop(name, true).await {
            Ok(()) | Err(RegistryError::NotSupervising { .. }) => {}
            Err(e) => return Err(e),
        }
        self.start(name, &[]).await
    }

    /// Replaces the static argument list of `name`; restarts it when supervised.
    pub async fn update_args(&self, name: &str, args: &[String]) -> Result<(), RegistryError> {
        if args.is_empty() {
            return Err(RegistryError::EmptyArgs {
                name: name.to_string(),
            });
        }
        let keeper = self.get(name).await?;
        let supervising = keeper.replace_args(args.to_vec()).await;
        self.bus.publish(
            Event::new(EventKind::ArgsUpdated)
                .with_process(name)
                .with_reason(args.join(" ")),
        );

        if supervising {
            self.restart(name).await
        } else {
            Ok(())
        }
    }

    /// True while `name` is supervised (not necessarily with a live child).
    pub async fn running(&self, name: &str) -> bool {
        match self.get(name).await {
            Ok(keeper) => keeper.supervising().await,
            Err(_) => false,
        }
    }

    /// Registered names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keepers.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of `name`, if registered.
    pub async fn status(&self, name: &str) -> Option<ProcessStatus> {
        let keeper = self.get(name).await.ok()?;
        Some(keeper.status().await)
    }

    /// Waits for an OS termination signal, then stops everything.
    pub async fn stop_all_on_signal(&self) -> std::io::Result<()> {
        wait_for_shutdown_signal().await?;
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.stop_all().await;
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Arc<Keeper>, RegistryError> {
        self.keepers
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.runtime.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ArgsFn;

    fn registry(cfg: Config) -> Arc<Registry> {
        Registry::builder(cfg).build()
    }

    #[tokio::test]
    async fn add_rejects_missing_launch_and_conflicts() {
        let reg = registry(Config::default());

        let err = reg.add("empty", ProcessSpec::default()).await.unwrap_err();
        assert!(matches!(err, RegistryError::MissingLaunch { .. }));
        assert!(!reg.exists("empty").await);

        reg.add("web", ProcessSpec::new(["true"])).await.unwrap();
        let err = reg.add("web", ProcessSpec::new(["false"])).await.unwrap_err();
        assert!(matches!(err, RegistryError::NameConflict { .. }));
        assert_eq!(reg.list().await, vec!["web".to_string()]);
    }

    #[tokio::test]
    async fn add_then_remove_round_trip() {
        let reg = registry(Config::default());
        reg.add("b", ProcessSpec::new(["true"])).await.unwrap();
        reg.add("a", ProcessSpec::new(["true"])).await.unwrap();
        assert_eq!(reg.list().await, vec!["a".to_string(), "b".to_string()]);

        reg.remove("a").await.unwrap();
        assert!(!reg.exists("a").await);
        assert!(matches!(
            reg.remove("a").await.unwrap_err(),
            RegistryError::NotFound { .. }
        ));

        // the name is free again
        reg.add("a", ProcessSpec::new(["true"])).await.unwrap();
    }

    struct Collect(Arc<std::sync::Mutex<Vec<EventKind>>>);

    #[async_trait::async_trait]
    impl crate::subscribers::Subscribe for Collect {
        async fn on_event(&self, e: &Event) {
            self.0.lock().unwrap().push(e.kind);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    #[tokio::test]
    async fn subscribers_observe_registry_events() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let subs: Vec<Arc<dyn crate::subscribers::Subscribe>> =
            vec![Arc::new(Collect(Arc::clone(&seen)))];
        let reg = Registry::builder(Config::default())
            .with_subscribers(subs)
            .build();

        reg.add("x", ProcessSpec::new(["true"])).await.unwrap();
        reg.remove("x").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::ProcessAdded, EventKind::ProcessRemoved]
        );
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let reg = registry(Config::default());
        assert!(matches!(
            reg.start("ghost", &[]).await.unwrap_err(),
            RegistryError::NotFound { .. }
        ));
        assert!(matches!(
            reg.stop("ghost", true).await.unwrap_err(),
            RegistryError::NotFound { .. }
        ));
        assert!(!reg.running("ghost").await);
        assert!(reg.status("ghost").await.is_none());
    }

    #[tokio::test]
    async fn update_args_rejects_empty_list() {
        let reg = registry(Config::default());
        reg.add("x", ProcessSpec::new(["true"])).await.unwrap();
        assert!(matches!(
            reg.update_args("x", &[]).await.unwrap_err(),
            RegistryError::EmptyArgs { .. }
        ));
    }

    #[tokio::test]
    async fn pre_start_veto_leaves_process_stopped() {
        let reg = registry(Config::default());
        reg.add(
            "gated",
            ProcessSpec::new(["sleep", "30"]).on_start(|_| Err("maintenance".to_string())),
        )
        .await
        .unwrap();

        let err = reg.start("gated", &[]).await.unwrap_err();
        assert!(matches!(err, RegistryError::PreStartRejected { ref reason, .. } if reason == "maintenance"));
        assert!(!reg.running("gated").await);
    }

    #[tokio::test]
    async fn computation_failure_surfaces_from_start() {
        let reg = registry(Config::default());
        reg.add(
            "computed",
            ProcessSpec::computed(ArgsFn::arc(|_: &[String]| {
                Err::<Vec<String>, _>("no free port".to_string())
            })),
        )
        .await
        .unwrap();

        let err = reg.start("computed", &[]).await.unwrap_err();
        match err {
            RegistryError::Launch { source, .. } => assert!(source.is_spawn_failure()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!reg.running("computed").await);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::{Duration, Instant};

        use crate::core::status::Phase;
        use crate::error::LaunchError;

        #[tokio::test]
        async fn crash_loop_gives_up_and_reports_last_exit() {
            let reg = registry(Config::default());
            let launches = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&launches);

            let spec = ProcessSpec::computed(ArgsFn::arc(move |_: &[String]| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(vec!["sh".into(), "-c".into(), "exit 3".into()])
            }))
            .with_max_retries(2)
            .with_restart_delay(Duration::from_millis(10));
            reg.add("flaky", spec).await.unwrap();

            let err = reg.start("flaky", &[]).await.unwrap_err();
            match err {
                RegistryError::Launch { source, .. } => {
                    assert!(matches!(source, LaunchError::Exit { .. }));
                    assert_eq!(source.exit_code(), Some(3));
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(launches.load(Ordering::SeqCst), 3);
            assert!(!reg.running("flaky").await);

            // a spent budget stays spent until the next start
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert_eq!(launches.load(Ordering::SeqCst), 3);

            let status = reg.status("flaky").await.unwrap();
            assert_eq!(status.phase, Phase::Idle);
            assert_eq!(status.retries, 3);
            assert!(status.last_error.is_some());
        }

        #[tokio::test]
        async fn spawn_failure_surfaces_from_start() {
            let reg = registry(Config::default());
            reg.add("missing", ProcessSpec::new(["/no/such/binary"]))
                .await
                .unwrap();
            let err = reg.start("missing", &[]).await.unwrap_err();
            assert!(matches!(
                err,
                RegistryError::Launch { source: LaunchError::Spawn { .. }, .. }
            ));
        }

        #[tokio::test]
        async fn start_is_idempotent_and_remove_needs_stop() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            reg.add("svc", ProcessSpec::new(["sleep", "30"])).await.unwrap();

            reg.start("svc", &[]).await.unwrap();
            let pid = reg.status("svc").await.unwrap().pid;
            assert!(pid.is_some());

            reg.start("svc", &[]).await.unwrap();
            assert_eq!(reg.status("svc").await.unwrap().pid, pid);

            assert!(matches!(
                reg.remove("svc").await.unwrap_err(),
                RegistryError::StillSupervising { .. }
            ));

            reg.stop("svc", true).await.unwrap();
            assert!(!reg.running("svc").await);
            assert!(matches!(
                reg.stop("svc", false).await.unwrap_err(),
                RegistryError::NotSupervising { .. }
            ));
            reg.remove("svc").await.unwrap();
        }

        #[tokio::test]
        async fn waiting_stop_returns_after_post_stop_hook() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            let hooks = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&hooks);
            reg.add(
                "svc",
                ProcessSpec::new(["sleep", "30"]).on_stop(move |_| {
                    std::thread::sleep(Duration::from_millis(50));
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

            reg.start("svc", &[]).await.unwrap();
            reg.stop("svc", true).await.unwrap();
            assert_eq!(hooks.load(Ordering::SeqCst), 1);
            assert!(!reg.running("svc").await);
        }

        #[tokio::test]
        async fn stubborn_child_is_killed_after_timeout() {
            let cfg = Config {
                start_grace: Duration::from_millis(200),
                ..Config::default()
            };
            let reg = registry(cfg);
            reg.add("stubborn", ProcessSpec::new(["sh", "-c", "trap '' TERM; sleep 10"]))
                .await
                .unwrap();

            reg.start("stubborn", &[]).await.unwrap();
            let stopped_at = Instant::now();
            reg.stop("stubborn", true).await.unwrap();
            let took = stopped_at.elapsed();

            assert!(took >= Duration::from_secs(3), "stopped after {took:?}");
            assert!(took < Duration::from_secs(10), "stopped after {took:?}");
            assert!(!reg.running("stubborn").await);
        }

        #[tokio::test]
        async fn update_args_restarts_supervised_process() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            reg.add("svc", ProcessSpec::new(["sleep", "30"])).await.unwrap();
            reg.start("svc", &[]).await.unwrap();
            let before = reg.status("svc").await.unwrap().pid;

            reg.update_args("svc", &["sleep".to_string(), "40".to_string()])
                .await
                .unwrap();
            let after = reg.status("svc").await.unwrap();
            assert!(after.supervising);
            assert_ne!(after.pid, before);

            reg.stop_all().await;
            assert!(!reg.running("svc").await);
        }

        #[tokio::test]
        async fn stop_all_waits_for_every_process() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            for name in ["a", "b", "c"] {
                reg.add(name, ProcessSpec::new(["sleep", "30"])).await.unwrap();
            }
            reg.start("a", &[]).await.unwrap();
            reg.start("b", &[]).await.unwrap();

            reg.stop_all().await;
            for name in ["a", "b", "c"] {
                assert!(!reg.running(name).await);
            }
        }

        fn counted(launches: &Arc<AtomicUsize>, argv: &'static [&'static str]) -> ProcessSpec {
            let counter = Arc::clone(launches);
            ProcessSpec::computed(ArgsFn::arc(move |_: &[String]| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(argv.iter().map(|s| s.to_string()).collect())
            }))
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_starts_launch_one_child() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            let launches = Arc::new(AtomicUsize::new(0));
            reg.add("svc", counted(&launches, &["sleep", "30"])).await.unwrap();

            let starts = (0..16).map(|_| {
                let reg = Arc::clone(&reg);
                tokio::spawn(async move { reg.start("svc", &[]).await })
            });
            for res in join_all(starts).await {
                res.unwrap().unwrap();
            }

            assert_eq!(launches.load(Ordering::SeqCst), 1);
            assert!(reg.running("svc").await);
            reg.stop("svc", true).await.unwrap();
            assert_eq!(launches.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn stop_interrupts_restart_delay() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            reg.add(
                "idle",
                ProcessSpec::new(["true"])
                    .with_max_retries(5)
                    .with_restart_delay(Duration::from_secs(20)),
            )
            .await
            .unwrap();
            reg.start("idle", &[]).await.unwrap();

            let deadline = Instant::now() + Duration::from_secs(2);
            while reg.status("idle").await.unwrap().phase != Phase::Backoff {
                assert!(Instant::now() < deadline, "never reached backoff");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }

            let stopped_at = Instant::now();
            reg.stop("idle", true).await.unwrap();
            assert!(stopped_at.elapsed() < Duration::from_secs(1));
            assert!(!reg.running("idle").await);
            assert_eq!(reg.status("idle").await.unwrap().phase, Phase::Idle);
        }

        #[tokio::test]
        async fn long_lived_exits_do_not_spend_the_budget() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            let launches = Arc::new(AtomicUsize::new(0));
            reg.add(
                "steady",
                counted(&launches, &["sleep", "0.1"])
                    .with_max_retries(0)
                    .with_recover_after(Duration::from_millis(50))
                    .with_restart_delay(Duration::from_millis(10)),
            )
            .await
            .unwrap();
            reg.start("steady", &[]).await.unwrap();

            tokio::time::sleep(Duration::from_millis(600)).await;
            assert!(launches.load(Ordering::SeqCst) >= 3);
            assert!(reg.running("steady").await);
            assert_eq!(reg.status("steady").await.unwrap().retries, 0);

            reg.stop("steady", true).await.unwrap();
        }

        #[tokio::test]
        async fn dropping_registry_stops_its_children() {
            let cfg = Config {
                start_grace: Duration::from_millis(100),
                ..Config::default()
            };
            let reg = registry(cfg);
            let gone = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&gone);
            reg.add(
                "svc",
                ProcessSpec::new(["sleep", "30"]).on_stop(move |_| {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();
            reg.start("svc", &[]).await.unwrap();
            drop(reg);

            let deadline = Instant::now() + Duration::from_secs(2);
            while gone.load(Ordering::SeqCst) == 0 {
                assert!(Instant::now() < deadline, "loop outlived its registry");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}
