//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for reacting to runner events. Each
//! subscriber gets its own bounded queue and worker task inside the
//! [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker ──► subscriber.on_event()
//!                                   └─► panic caught → EventKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - A slow subscriber only delays its own queue; the runner never waits on it.
//! - On overflow the event is dropped for that subscriber only and
//!   `EventKind::SubscriberOverflow` is published.
//! - Each subscriber sees events in publish order.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use cuj_runner::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ActionFailed {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failure-counter"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events and logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
