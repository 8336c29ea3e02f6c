//! Runtime core: scheduling, dispatch, and cleanup.
//!
//! The public entry point is [`Runner`]. Internal modules:
//! - `scheduler`: the ready-queue loop and the run report;
//! - `runner`: one dispatch with event publishing and error annotation;
//! - `queue`: min-heap ordered by start offset, then insertion;
//! - `cleanup`: the LIFO cleanup stack;
//! - `config`: [`RunnerConfig`];
//! - `shutdown`: signal and deadline cancellation helpers.

mod cleanup;
mod config;
mod queue;
mod runner;
mod scheduler;
mod shutdown;

pub use config::RunnerConfig;
pub use scheduler::{Dispatch, RunReport, Runner};
pub use shutdown::{cancel_after, cancel_on_signal, wait_for_shutdown_signal};
