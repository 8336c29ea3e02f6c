//! # Bus listener.
//!
//! [`Observer`] owns a [`Bus`] and a background task that forwards every
//! published event to a [`SubscriberSet`].
//!
//! ```text
//! Runner ──► Bus ──► listener ──► SubscriberSet::emit
//!                       │
//!        shutdown() ────┘ drain what is queued, then close the set
//! ```
//!
//! Subscriber panics and overflows raised while the set drains on shutdown
//! are published after the listener stopped reading. The set still logs them
//! with `warn!`, and any other receiver of [`Observer::bus`] still sees them;
//! they are not fed back to the subscribers.

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Bus plus the task feeding its subscribers.
pub struct Observer {
    bus: Bus,
    stop: CancellationToken,
    listener: JoinHandle<()>,
}

impl Observer {
    /// Creates a bus of `capacity` and starts the listener.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(capacity: usize, subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(capacity);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(subs, bus.clone());
        let stop = CancellationToken::new();
        let stop_listener = stop.clone();

        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop_listener.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(&ev),
                                Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });

        Self {
            bus,
            stop,
            listener,
        }
    }

    /// Handle for publishers.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Delivers every event published so far, then stops the subscribers.
    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.listener.await;
    }
}
