//! Journey data model: wire descriptors, start specifiers, and the loaded task chain.
//!
//! ## Contents
//! - [`ActionDescriptor`] one element of the journey JSON array
//! - [`Args`] opaque argument payload handed to handlers
//! - [`StartSpec`], [`parse_duration`], [`format_duration`] start specifier text
//! - [`Journey`], [`Task`] the loader output consumed by the scheduler

mod args;
mod descriptor;
mod loader;
mod schedule;

pub use args::Args;
pub use descriptor::ActionDescriptor;
pub use loader::{Journey, Task};
pub use schedule::{DEFAULT_RELATIVE, DurationError, StartSpec, format_duration, parse_duration};
