//! # Process specification.
//!
//! [`ProcessSpec`] describes one supervised program: how to build its command
//! line, its environment and stdio, its retry policy, and its lifecycle hooks.
//! Policy fields left unset are filled from the registry's
//! [`Config`](crate::Config) when the spec is added.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use procvisor::{ProcessSpec, Redirect, StopSignal};
//!
//! let spec = ProcessSpec::new(["python3", "-m", "http.server", "8000"])
//!     .with_env("PYTHONUNBUFFERED", "1")
//!     .with_stdout(Redirect::file("/tmp/http.log"))
//!     .with_max_retries(5)
//!     .with_recover_after(Duration::from_secs(60))
//!     .with_stop_signal(StopSignal::Int)
//!     .on_stop(|_spec| println!("http server gone"));
//!
//! assert!(spec.has_launch());
//! assert_eq!(spec.max_retries(), Some(5));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::Config;
use crate::error::LaunchError;
use crate::policies::{BackoffPolicy, RetryPolicy};
use crate::process::{ArgsRef, Redirect, StopSignal};

/// Pre-start hook; an `Err` vetoes the start.
pub type PreStartHook = Arc<dyn Fn(&ProcessSpec) -> Result<(), String> + Send + Sync>;

/// Post-stop hook; runs once after each supervision cycle has fully ended.
pub type PostStopHook = Arc<dyn Fn(&ProcessSpec) + Send + Sync>;

/// Specification of a supervised process.
#[derive(Clone, Default)]
pub struct ProcessSpec {
    args: Vec<String>,
    compute: Option<ArgsRef>,
    env: Vec<(String, String)>,
    shell: bool,
    stdin: Redirect,
    stdout: Redirect,
    stderr: Redirect,
    max_retries: Option<u32>,
    recover_after: Option<Duration>,
    restart_delay: Option<BackoffPolicy>,
    stop_signal: Option<StopSignal>,
    on_start: Option<PreStartHook>,
    on_stop: Option<PostStopHook>,
}

impl ProcessSpec {
    /// Spec with a static argument list (program first).
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Spec whose arguments are computed at every launch.
    pub fn computed(compute: ArgsRef) -> Self {
        Self {
            compute: Some(compute),
            ..Self::default()
        }
    }

    /// Adds an environment override.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Runs the joined argument line through the platform shell.
    pub fn with_shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    /// Sets the stdin source.
    pub fn with_stdin(mut self, target: Redirect) -> Self {
        self.stdin = target;
        self
    }

    /// Sets the stdout target.
    pub fn with_stdout(mut self, target: Redirect) -> Self {
        self.stdout = target;
        self
    }

    /// Sets the stderr target.
    pub fn with_stderr(mut self, target: Redirect) -> Self {
        self.stderr = target;
        self
    }

    /// Sets the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the recovery duration.
    pub fn with_recover_after(mut self, recover_after: Duration) -> Self {
        self.recover_after = Some(recover_after);
        self
    }

    /// Sets a constant inter-restart delay.
    pub fn with_restart_delay(self, delay: Duration) -> Self {
        self.with_restart_backoff(BackoffPolicy::constant(delay))
    }

    /// Sets a (possibly growing) inter-restart delay.
    pub fn with_restart_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.restart_delay = Some(backoff);
        self
    }

    /// Sets the graceful termination signal.
    pub fn with_stop_signal(mut self, signal: StopSignal) -> Self {
        self.stop_signal = Some(signal);
        self
    }

    /// Installs the pre-start hook.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ProcessSpec) -> Result<(), String> + Send + Sync + 'static,
    {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Installs the post-stop hook.
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ProcessSpec) + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }

    /// True if the spec can produce a command line.
    pub fn has_launch(&self) -> bool {
        !self.args.is_empty() || self.compute.is_some()
    }

    /// Static argument list.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment overrides.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Shell-wrapping flag.
    pub fn shell(&self) -> bool {
        self.shell
    }

    /// Configured retry budget, if set.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Configured recovery duration, if set.
    pub fn recover_after(&self) -> Option<Duration> {
        self.recover_after
    }

    /// Configured stop signal, if set.
    pub fn stop_signal(&self) -> Option<StopSignal> {
        self.stop_signal
    }

    pub(crate) fn stdin(&self) -> &Redirect {
        &self.stdin
    }

    pub(crate) fn stdout(&self) -> &Redirect {
        &self.stdout
    }

    pub(crate) fn stderr(&self) -> &Redirect {
        &self.stderr
    }

    pub(crate) fn pre_start(&self) -> Option<&PreStartHook> {
        self.on_start.as_ref()
    }

    pub(crate) fn post_stop(&self) -> Option<&PostStopHook> {
        self.on_stop.as_ref()
    }

    pub(crate) fn set_args(&mut self, args: Vec<String>) {
        self.args = args;
    }

    /// Fills every unset policy field from `cfg`.
    pub(crate) fn fill_defaults(&mut self, cfg: &Config) {
        self.max_retries.get_or_insert(cfg.max_retries);
        self.recover_after.get_or_insert(cfg.recover_after);
        self.restart_delay.get_or_insert(cfg.restart_delay);
        self.stop_signal.get_or_insert(cfg.stop_signal);
    }

    /// Retry policy with defaults applied.
    pub fn retry_policy(&self) -> RetryPolicy {
        let base = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            recover_after: self.recover_after.unwrap_or(base.recover_after),
            restart_delay: self.restart_delay.unwrap_or(base.restart_delay),
        }
    }

    /// Concrete argument vector for one launch, shell-wrapped if requested.
    pub(crate) fn command_line(&self, start_args: &[String]) -> Result<Vec<String>, LaunchError> {
        let args = match &self.compute {
            Some(compute) => compute
                .compute(start_args)
                .map_err(|reason| LaunchError::Args { reason })?,
            None => self.args.clone(),
        };
        if self.shell {
            return Ok(vec![shell_path(), "-c".to_string(), args.join(" ")]);
        }
        Ok(args)
    }
}

impl fmt::Debug for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSpec")
            .field("args", &self.args)
            .field("computed", &self.compute.is_some())
            .field("env", &self.env)
            .field("shell", &self.shell)
            .field("stdin", &self.stdin)
            .field("stdout", &self.stdout)
            .field("stderr", &self.stderr)
            .field("max_retries", &self.max_retries)
            .field("recover_after", &self.recover_after)
            .field("restart_delay", &self.restart_delay)
            .field("stop_signal", &self.stop_signal)
            .finish_non_exhaustive()
    }
}

/// Shell used for shell-wrapped launches.
#[cfg(unix)]
pub(crate) fn shell_path() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}

/// Shell used for shell-wrapped launches.
#[cfg(not(unix))]
pub(crate) fn shell_path() -> String {
    "powershell.exe".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ArgsFn;

    #[test]
    fn empty_spec_has_no_launch() {
        assert!(!ProcessSpec::default().has_launch());
        assert!(!ProcessSpec::new(Vec::<String>::new()).has_launch());
    }

    #[test]
    fn computed_spec_has_launch() {
        let spec = ProcessSpec::computed(ArgsFn::arc(|_: &[String]| {
            Ok::<_, String>(vec!["true".to_string()])
        }));
        assert!(spec.has_launch());
    }

    #[test]
    fn defaults_fill_only_unset_fields() {
        let mut spec = ProcessSpec::new(["sleep", "1"]).with_max_retries(7);
        spec.fill_defaults(&Config::default());

        let policy = spec.retry_policy();
        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.recover_after, Duration::from_secs(20));
        assert_eq!(policy.restart_delay.next(0), Duration::from_millis(500));
        assert_eq!(spec.stop_signal(), Some(StopSignal::Term));
    }

    #[test]
    fn shell_wrapping_joins_arguments() {
        let spec = ProcessSpec::new(["echo", "a", "b"]).with_shell(true);
        let line = spec.command_line(&[]).unwrap();
        assert_eq!(line.len(), 3);
        assert_eq!(line[0], shell_path());
        assert_eq!(line[1], "-c");
        assert_eq!(line[2], "echo a b");
    }

    #[test]
    fn computation_receives_start_args_and_static_list_ignores_them() {
        let computed = ProcessSpec::computed(ArgsFn::arc(|extra: &[String]| {
            let mut v = vec!["prog".to_string()];
            v.extend_from_slice(extra);
            Ok::<_, String>(v)
        }));
        let line = computed.command_line(&["--x".to_string()]).unwrap();
        assert_eq!(line, vec!["prog", "--x"]);

        let fixed = ProcessSpec::new(["prog", "--y"]);
        assert_eq!(fixed.command_line(&["--x".to_string()]).unwrap(), vec!["prog", "--y"]);
    }

    #[test]
    fn computation_failure_is_an_args_error() {
        let spec = ProcessSpec::computed(ArgsFn::arc(|_: &[String]| {
            Err::<Vec<String>, _>("no port".to_string())
        }));
        let err = spec.command_line(&[]).unwrap_err();
        assert!(matches!(err, LaunchError::Args { ref reason } if reason == "no port"));
    }
}
