//! # cuj-runner
//!
//! **cuj-runner** executes composed user journeys: time-scheduled sequences
//! of UI actions driven end-to-end against a live session, with every
//! acquired resource released in reverse order when the journey ends.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   journey.json ──► Journey::load ──► Journey { tasks (st, rt, blocked) }
//!                                              │
//!                                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runner (single cooperative loop)                                 │
//! │  - ReadyQueue (min st, ties by insertion)                         │
//! │  - Registry (name → Action, read-only)                            │
//! │  - CleanupStack (LIFO, drained on every exit path)                │
//! └──────┬───────────────────────────────┬────────────────────────────┘
//!        │ run_once(action, ctx, args)   │ publish(Event)
//!        ▼                               ▼
//!  ┌──────────────┐             ┌──────────────────┐
//!  │   Session    │             │   Bus            │──► Observer ──► SubscriberSet
//!  │ (dryrun/tcp) │             │ (broadcast)      │                 ├─ LogWriter
//!  └──────────────┘             └──────────────────┘                 └─ custom
//! ```
//!
//! ### Journey lifecycle
//! ```text
//! load ──► push independent tasks (by st)
//!
//! loop {
//!   ├─► pop earliest task
//!   ├─► sleep until start + st         (cancellable → Cancelled)
//!   ├─► registry lookup                (missing → UnknownAction)
//!   ├─► run_once                       (Err → stop)
//!   │       └─ cleanup? → CleanupStack
//!   └─► blocked dependent? → push at (completion + rt)
//! }
//!
//! drain CleanupStack (LIFO, fresh token, per-cleanup timeout)
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                          |
//! |-----------------|----------------------------------------------------------|---------------------------------------------|
//! | **Journeys**    | Parse the JSON format and derive the dependency chain.   | [`Journey`], [`Task`], [`StartSpec`]        |
//! | **Actions**     | Implement steps as traits or closures, with cleanups.    | [`Action`], [`ActionFn`], [`Outcome`]       |
//! | **Registry**    | Bind names to actions; built-ins included.               | [`Registry`]                                |
//! | **Scheduling**  | Run a journey with cancellation and LIFO cleanup.        | [`Runner`], [`RunnerConfig`], [`RunReport`] |
//! | **Events**      | Observe the run without slowing it.                      | [`Subscribe`], [`SubscriberSet`], [`Event`] |
//! | **Metrics**     | Record histograms around a run, write `perf_values.txt`. | [`metrics::Recorder`], [`metrics::PerfValues`] |
//! | **Errors**      | Typed errors carrying the failing task's position.       | [`JourneyError`], [`RunError`]              |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use cuj_runner::{Journey, Registry, Runner, RunnerConfig};
//! use cuj_runner::session::{DryRunSession, SessionCall, SessionRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let journey = Journey::from_json(r#"[
//!         {"action":"OpenUrl","args":{"url":"https://example.test/"},"start":"0s"},
//!         {"action":"ClickUI","args":{"role":"button","name":"Go"},"start":"+10ms"},
//!         {"action":"LockScreen","start":"+10ms"},
//!         {"action":"UnlockScreen","start":"+10ms"}
//!     ]"#)?;
//!
//!     let dry = Arc::new(DryRunSession::new("dryrun://doc"));
//!     let session: SessionRef = dry.clone();
//!     let cfg = RunnerConfig::default().with_credential("1234");
//!
//!     let report = Runner::with_config(Registry::with_builtins(), cfg)
//!         .run(&journey, &CancellationToken::new(), &session)
//!         .await?;
//!
//!     assert_eq!(report.order(), vec![0, 1, 2, 3]);
//!     // The tab opened first is closed last, after the journey.
//!     assert!(matches!(dry.calls().last(), Some(SessionCall::CloseTab(_))));
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod core;
mod error;
pub mod events;
pub mod journey;
pub mod metrics;
pub mod session;
pub mod subscribers;

// ---- Public re-exports ----

pub use actions::{Action, ActionContext, ActionFn, ActionRef, Cleanup, IntoOutcome, Outcome, Registry};
pub use core::{Dispatch, RunReport, Runner, RunnerConfig};
pub use error::{
    ActionError, CleanupFailure, JourneyError, MetricsError, Position, RegistryError, RunError, SessionError,
};
pub use events::{Bus, Event, EventKind};
pub use journey::{ActionDescriptor, Args, Journey, StartSpec, Task, format_duration, parse_duration};
pub use subscribers::{DispatchLog, LogWriter, Subscribe, SubscriberSet};
