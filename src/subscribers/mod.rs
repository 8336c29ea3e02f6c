//! # Event subscribers.
//!
//! ```text
//! Runner ── publish(Event) ──► Bus ──► Observer ──► SubscriberSet
//!                                                     ├──► LogWriter   (tracing)
//!                                                     ├──► DispatchLog (in-memory)
//!                                                     └──► custom Subscribe impls
//! ```
//!
//! ## Contents
//! - [`Subscribe`] the subscriber trait
//! - [`SubscriberSet`] per-subscriber queues and workers
//! - [`Observer`] bus plus the listener feeding the set
//! - [`LogWriter`], [`DispatchLog`] built-in subscribers

mod dispatch_log;
mod log;
mod observer;
mod set;
mod subscribe;

pub use dispatch_log::DispatchLog;
pub use log::LogWriter;
pub use observer::Observer;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
