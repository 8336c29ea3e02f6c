//! # Journey events emitted by the runner.
//!
//! [`EventKind`] classifies what happened:
//! - **Journey events**: a run starting, finishing, or being cancelled
//! - **Action events**: one task being scheduled, dispatched, completed, or failing
//! - **Cleanup events**: a cleanup continuation failing during the drain
//! - **Subscriber events**: a subscriber dropping an event or panicking
//!
//! [`Event`] carries the metadata: action name, descriptor index, offset from
//! journey start, and a free-form reason.
//!
//! ## Ordering guarantees
//! Every event gets a process-wide sequence number (`seq`) that increases
//! monotonically. Subscribers may see events late; `seq` restores the order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use cuj_runner::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ActionFailed)
//!     .with_action("OpenUrl", 2)
//!     .with_offset(Duration::from_millis(1500))
//!     .with_reason("tab crashed");
//!
//! assert_eq!(ev.kind, EventKind::ActionFailed);
//! assert_eq!(ev.action.as_deref(), Some("OpenUrl"));
//! assert_eq!(ev.index, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runner events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Journey ===
    /// A journey run began.
    ///
    /// Sets:
    /// - `reason`: `tasks=<n>`
    JourneyStarting,

    /// The run ended without cancellation, successfully or not.
    ///
    /// Sets:
    /// - `offset`: total elapsed time
    /// - `reason`: error text, when the run failed
    JourneyFinished,

    /// The run ended because its token fired.
    ///
    /// Sets:
    /// - `offset`: elapsed time at cancellation
    JourneyCancelled,

    // === Action ===
    /// A task became ready and was given a start time.
    ///
    /// Sets:
    /// - `action`, `index`
    /// - `offset`: scheduled start
    ActionScheduled,

    /// A task is being dispatched to its handler.
    ///
    /// Sets:
    /// - `action`, `index`
    /// - `offset`: actual start
    ActionStarting,

    /// A handler returned success.
    ///
    /// Sets:
    /// - `action`, `index`
    /// - `offset`: completion time
    ActionCompleted,

    /// A handler failed, or the action name was unknown.
    ///
    /// Sets:
    /// - `action`, `index`
    /// - `offset`: failure time
    /// - `reason`: error text
    ActionFailed,

    // === Cleanup ===
    /// A cleanup continuation returned an error.
    ///
    /// Sets:
    /// - `action`, `index`: the action that registered it
    /// - `reason`: error text
    CleanupFailed,

    // === Subscriber ===
    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `action`: subscriber name
    /// - `reason`: `full` or `closed`
    SubscriberOverflow,

    /// A subscriber panicked while handling an event.
    ///
    /// Sets:
    /// - `action`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,
}

impl EventKind {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::JourneyStarting => "journey_starting",
            EventKind::JourneyFinished => "journey_finished",
            EventKind::JourneyCancelled => "journey_cancelled",
            EventKind::ActionScheduled => "action_scheduled",
            EventKind::ActionStarting => "action_starting",
            EventKind::ActionCompleted => "action_completed",
            EventKind::ActionFailed => "action_failed",
            EventKind::CleanupFailed => "cleanup_failed",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Runner event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    pub kind: EventKind,
    /// Action name (or subscriber name for subscriber events).
    pub action: Option<Arc<str>>,
    /// Descriptor index.
    pub index: Option<usize>,
    /// Offset from journey start.
    pub offset: Option<Duration>,
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates an event stamped with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            action: None,
            index: None,
            offset: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_action(mut self, action: impl Into<Arc<str>>, index: usize) -> Self {
        self.action = Some(action.into());
        self.index = Some(index);
        self
    }

    #[inline]
    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = Some(offset);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.action = Some(subscriber.into());
        ev
    }

    /// Subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.action = Some(subscriber.into());
        ev
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
