//! # Per-launch argument computation.
//!
//! A [`ComputeArgs`] implementation is called at **every** launch of a process,
//! with the arguments passed to [`Registry::start`](crate::Registry::start). It
//! returns the full argument vector (program first). This lets a restart pick up
//! fresh values such as a newly allocated port.
//!
//! [`ArgsFn`] adapts a plain closure:
//! ```rust
//! use procvisor::{ArgsFn, ArgsRef, ComputeArgs};
//!
//! let args: ArgsRef = ArgsFn::arc(|extra: &[String]| {
//!     let mut argv = vec!["python3".to_string(), "app.py".to_string()];
//!     if extra.is_empty() {
//!         argv.push("--default".to_string());
//!     } else {
//!         argv.extend_from_slice(extra);
//!     }
//!     Ok::<_, String>(argv)
//! });
//! assert_eq!(args.compute(&[]).unwrap().len(), 3);
//! ```

use std::fmt;
use std::sync::Arc;

/// Computes the argument vector of one launch.
pub trait ComputeArgs: Send + Sync + 'static {
    /// Returns the argument vector (program first) or a failure description.
    fn compute(&self, start_args: &[String]) -> Result<Vec<String>, String>;
}

/// Shared handle to an argument computation.
pub type ArgsRef = Arc<dyn ComputeArgs>;

/// Closure-backed [`ComputeArgs`].
pub struct ArgsFn<F> {
    f: F,
}

impl<F> ArgsFn<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F> fmt::Debug for ArgsFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArgsFn")
    }
}

impl<F> ComputeArgs for ArgsFn<F>
where
    F: Fn(&[String]) -> Result<Vec<String>, String> + Send + Sync + 'static,
{
    fn compute(&self, start_args: &[String]) -> Result<Vec<String>, String> {
        (self.f)(start_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_receives_start_args() {
        let args = ArgsFn::new(|extra: &[String]| {
            let mut v = vec!["echo".to_string()];
            v.extend_from_slice(extra);
            Ok::<_, String>(v)
        });
        let out = args.compute(&["hi".to_string()]).unwrap();
        assert_eq!(out, vec!["echo", "hi"]);
    }

    #[test]
    fn closure_errors_pass_through() {
        let args = ArgsFn::new(|_: &[String]| Err::<Vec<String>, _>("no config".to_string()));
        assert_eq!(args.compute(&[]).unwrap_err(), "no config");
    }
}
