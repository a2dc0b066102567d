//! # Non-blocking event fan-out to multiple subscribers.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - `emit()` returns immediately (`try_send`)
//! - Per-subscriber FIFO; no ordering across subscribers
//! - Overflow drops the event for that subscriber only and reports `SubscriberOverflow`
//! - A panicking subscriber is isolated with `catch_unwind` and keeps receiving events

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator with per-subscriber queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic
                            .downcast_ref::<&'static str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
                        worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits an event to every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        // An overflow report that itself overflows must not be re-published.
        let is_overflow = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                tracing::warn!(subscriber = channel.name, reason, "subscriber dropped event");
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploder;

    #[async_trait]
    impl Subscribe for Exploder {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "exploder"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_and_survives_panicking_peer() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let recorder = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![recorder.clone(), Arc::new(Exploder)], bus);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::ProcessAdded));
        set.emit(&Event::new(EventKind::SupervisionStarted));

        let reported = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("panic report in time")
            .expect("bus open");
        assert_eq!(reported.kind, EventKind::SubscriberPanicked);
        assert_eq!(reported.process.as_deref(), Some("exploder"));

        set.shutdown().await;
        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![EventKind::ProcessAdded, EventKind::SupervisionStarted]
        );
    }
}
