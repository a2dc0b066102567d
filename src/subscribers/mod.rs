//! # Event subscribers.
//!
//! Every supervision event published on the [`Bus`](crate::Bus) is fanned out to
//! the subscribers registered with
//! [`RegistryBuilder::with_subscribers`](crate::RegistryBuilder::with_subscribers).
//!
//! ```text
//! Keeper ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                     ├──► LogWriter (tracing)
//!                                                     ├──► Metrics   (user)
//!                                                     └──► ...
//! ```
//!
//! ## Implementing a subscriber
//! ```no_run
//! use async_trait::async_trait;
//! use procvisor::{Event, EventKind, Subscribe};
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ProcessExited {
//!             // bump a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "crash-counter"
//!     }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
