//! # Event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]: the runner publishes without
//! waiting, and each listener gets its own receiver.
//!
//! ```text
//! Runner ── publish(Event) ──► Bus ──► Observer listener ──► SubscriberSet
//! SubscriberSet workers ──┘ (overflow / panic)
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - Capacity is one ring buffer shared by all receivers.
//! - A receiver that falls behind observes `RecvError::Lagged(n)` and skips `n` events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runner events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus; `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// New receiver; sees only events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
