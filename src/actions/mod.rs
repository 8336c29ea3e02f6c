//! Action handlers and the name registry.
//!
//! ## Contents
//! - [`Action`], [`ActionRef`] the handler trait and its shared handle
//! - [`ActionContext`] per-dispatch context (token, credential, position)
//! - [`Outcome`], [`Cleanup`], [`IntoOutcome`] what a handler reports
//! - [`ActionFn`] closure-backed handler
//! - [`Registry`], [`register`], [`global`] name to handler binding
//! - [`builtin`] `OpenUrl`, `LockScreen`, `UnlockScreen`, `ClickUI`

mod action;
mod action_fn;
pub mod builtin;
mod registry;

pub use action::{Action, ActionContext, ActionRef, Cleanup, IntoOutcome, Outcome};
pub use action_fn::ActionFn;
pub use registry::{Registry, global, register};
