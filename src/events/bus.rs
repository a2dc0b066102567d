//! # Event bus for broadcasting supervision events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that every supervision loop can
//! publish without blocking and without knowing who listens.
//!
//! ```text
//! Keeper "web"  ──┐
//! Keeper "db"   ──┼──► Bus ──► subscriber listener ──► SubscriberSet
//! Registry      ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - Capacity is one ring buffer shared by all receivers; laggards see `Lagged(n)`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for supervision events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// New receiver observing events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
