//! Runner events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! Publishers are the [`Runner`](crate::Runner) and the
//! [`SubscriberSet`](crate::SubscriberSet) workers (overflow/panic). The
//! [`Observer`](crate::subscribers::Observer) is the consumer that fans them
//! out to subscribers.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
