//! # Ephemeral ports for socket-serving processes.
//!
//! Some supervised programs take the port they should listen on as an argument.
//! [`EphemeralPort`] allocates a free port at every launch, reports it through an
//! explicit `on_allocated` callback, and composes the argument vector around it.
//! [`PortTable`] is the name→port lookup such a callback typically writes to, so a
//! relay can find the current port of a process after each restart.
//!
//! ```rust
//! use std::sync::Arc;
//! use procvisor::{ComputeArgs, EphemeralPort, PortTable};
//!
//! let ports = Arc::new(PortTable::new());
//! let args = EphemeralPort::new(
//!     |port, extra: &[String]| {
//!         let mut argv = vec!["node".into(), "server.js".into(), "--port".into(), port.to_string()];
//!         argv.extend_from_slice(extra);
//!         argv
//!     },
//!     ports.recorder("api"),
//! );
//!
//! let argv = args.compute(&[]).unwrap();
//! assert_eq!(argv[3], ports.get("api").unwrap().to_string());
//! ```

use std::collections::HashMap;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::{Arc, PoisonError, RwLock};

use crate::process::ComputeArgs;

/// Name→port lookup shared between launches and their consumers.
#[derive(Debug, Default)]
pub struct PortTable {
    pool: RwLock<HashMap<String, u16>>,
}

impl PortTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the OS for a free TCP port on the loopback interface.
    ///
    /// The probe listener is closed before returning, so the port is free but not
    /// reserved; the child is expected to bind it right away.
    pub fn allocate() -> std::io::Result<u16> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        Ok(listener.local_addr()?.port())
    }

    /// True if a port is recorded for `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Records `port` for `name`, returning the previous port if any.
    pub fn assign(&self, name: &str, port: u16) -> Option<u16> {
        self.pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), port)
    }

    /// Forgets the port of `name`, returning it if one was recorded.
    pub fn release(&self, name: &str) -> Option<u16> {
        self.pool
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Current port of `name`.
    pub fn get(&self, name: &str) -> Option<u16> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    /// `localhost:<port>` address of `name`.
    pub fn address(&self, name: &str) -> Option<String> {
        self.get(name).map(|port| format!("localhost:{port}"))
    }

    /// Callback for [`EphemeralPort`] that records each allocation under `name`.
    pub fn recorder(self: &Arc<Self>, name: impl Into<String>) -> impl Fn(u16) + Send + Sync + 'static {
        let table = Arc::clone(self);
        let name = name.into();
        move |port| {
            table.assign(&name, port);
        }
    }
}

/// [`ComputeArgs`] that allocates a fresh port for every launch.
pub struct EphemeralPort<C, A> {
    compose: C,
    on_allocated: A,
}

impl<C, A> EphemeralPort<C, A>
where
    C: Fn(u16, &[String]) -> Vec<String> + Send + Sync + 'static,
    A: Fn(u16) + Send + Sync + 'static,
{
    /// `compose` builds the argument vector from the port and the start arguments;
    /// `on_allocated` is told about every port before the child is spawned.
    pub fn new(compose: C, on_allocated: A) -> Self {
        Self {
            compose,
            on_allocated,
        }
    }
}

impl<C, A> ComputeArgs for EphemeralPort<C, A>
where
    C: Fn(u16, &[String]) -> Vec<String> + Send + Sync + 'static,
    A: Fn(u16) + Send + Sync + 'static,
{
    fn compute(&self, start_args: &[String]) -> Result<Vec<String>, String> {
        let port = PortTable::allocate().map_err(|e| format!("allocate port: {e}"))?;
        (self.on_allocated)(port);
        Ok((self.compose)(port, start_args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_nonzero_port() {
        let port = PortTable::allocate().unwrap();
        assert_ne!(port, 0);
    }

    #[test]
    fn assign_replaces_and_release_forgets() {
        let table = PortTable::new();
        assert_eq!(table.assign("relay", 4000), None);
        assert_eq!(table.assign("relay", 4001), Some(4000));
        assert_eq!(table.address("relay").as_deref(), Some("localhost:4001"));
        assert_eq!(table.release("relay"), Some(4001));
        assert!(!table.exists("relay"));
    }

    #[test]
    fn every_launch_gets_reported() {
        let table = Arc::new(PortTable::new());
        let args = EphemeralPort::new(
            |port, extra: &[String]| {
                let mut v = vec!["srv".to_string(), port.to_string()];
                v.extend_from_slice(extra);
                v
            },
            table.recorder("srv"),
        );

        let first = args.compute(&["-v".to_string()]).unwrap();
        assert_eq!(first[1], table.get("srv").unwrap().to_string());
        assert_eq!(first[2], "-v");

        let second = args.compute(&[]).unwrap();
        assert_eq!(second[1], table.get("srv").unwrap().to_string());
    }
}
