//! # Registry construction.
//!
//! [`RegistryBuilder`] wires the pieces a [`Registry`] runs with:
//! - the event [`Bus`], sized by `Config::bus_capacity`;
//! - the [`Terminate`] strategy (platform default unless overridden);
//! - the subscriber listener feeding [`SubscriberSet`].
//!
//! One runtime token is shared by the listener and every keeper loop; the
//! registry cancels it when dropped.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::registry::Registry;
use super::terminate::{Terminate, platform_terminator};
use crate::{
    core::Config,
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Registry`] with optional features.
pub struct RegistryBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    terminator: Option<Arc<dyn Terminate>>,
}

impl RegistryBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            terminator: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive every lifecycle event through dedicated workers
    /// with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Overrides the termination strategy.
    ///
    /// Defaults to [`platform_terminator`] with `Config::terminate_timeout`.
    pub fn with_terminator(mut self, terminator: Arc<dyn Terminate>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Builds the registry.
    ///
    /// Must be called inside a tokio runtime when subscribers are set: their
    /// workers and the bus listener are spawned here and live until the
    /// registry is dropped.
    pub fn build(self) -> Arc<Registry> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let terminator = self
            .terminator
            .unwrap_or_else(|| platform_terminator(self.cfg.terminate_timeout));
        let runtime = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_listener(&bus, subs, runtime.clone());
        }

        Arc::new(Registry::new_internal(self.cfg, bus, terminator, runtime))
    }
}

/// Forwards bus events to subscribers until `token` is cancelled.
fn spawn_listener(bus: &Bus, subs: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    let bus = bus.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "subscriber listener lagged");
                        bus.publish(
                            Event::new(EventKind::SubscriberOverflow)
                                .with_process("listener")
                                .with_reason(format!("lagged by {n} events")),
                        );
                    }
                }
            }
        }
        subs.shutdown().await;
    });
}
