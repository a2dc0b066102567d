//! # Subscriber trait
//!
//! Each subscriber is driven by its own worker fed from a bounded queue owned by
//! [`SubscriberSet`](crate::SubscriberSet), so a slow subscriber never delays a
//! supervision loop or another subscriber.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue; events beyond it are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
