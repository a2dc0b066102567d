//! Runtime events: types and broadcast bus.
//!
//! Groups the event **data model** and the **bus** that the registry and every
//! supervision loop publish to.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Registry` (add/remove/start conflicts), `Keeper` loops
//!   (spawn, exit, backoff, termination), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the registry's subscriber listener, which fans out to the
//!   user's [`Subscribe`](crate::Subscribe) implementations.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
