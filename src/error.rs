//! Error types used by the journey runner, its actions, and its collaborators.
//!
//! This module defines the error enums surfaced by the crate:
//!
//! - [`JourneyError`] why a journey failed to load or run (the taxonomy callers match on).
//! - [`RunError`] what [`Runner::run`](crate::Runner::run) returns: the primary
//!   [`JourneyError`] plus any [`CleanupFailure`]s collected while unwinding.
//! - [`ActionError`] what an individual action handler reports.
//! - [`SessionError`] failures of the UI automation backend.
//! - [`RegistryError`] invalid action registration.
//! - [`MetricsError`] recorder and perf-values failures.
//!
//! Every enum provides `as_label` (stable snake_case) for logs/metrics.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Location of a task inside a running journey.
///
/// Attached to every error raised after dispatch begins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// Action name as written in the journey.
    pub action: Arc<str>,
    /// Zero-based index of the descriptor in the journey file.
    pub index: usize,
    /// Time elapsed since the journey started when the error surfaced.
    pub since_start: Duration,
}

impl Position {
    pub fn new(action: impl Into<Arc<str>>, index: usize, since_start: Duration) -> Self {
        Self {
            action: action.into(),
            index,
            since_start,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "action #{} {:?} at {:?}",
            self.index, self.action, self.since_start
        )
    }
}

/// # Errors reported by action handlers.
///
/// A handler returns one of these (possibly together with a cleanup
/// continuation, see [`Outcome`](crate::Outcome)). The runner wraps it into a
/// [`JourneyError`] carrying the journey [`Position`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ActionError {
    /// The argument payload could not be decoded or failed validation.
    #[error("bad args: {error}")]
    BadArgs {
        /// Decoder or validation message.
        error: String,
    },

    /// The action ran and failed.
    #[error("action failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The action gave up waiting (handler-owned timeout).
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The journey context was cancelled while the action was running.
    #[error("context cancelled")]
    Canceled,
}

impl ActionError {
    /// Shorthand for [`ActionError::BadArgs`].
    pub fn bad_args(error: impl fmt::Display) -> Self {
        ActionError::BadArgs {
            error: error.to_string(),
        }
    }

    /// Shorthand for [`ActionError::Failed`].
    pub fn failed(error: impl fmt::Display) -> Self {
        ActionError::Failed {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cuj_runner::ActionError;
    ///
    /// let err = ActionError::bad_args("missing field `url`");
    /// assert_eq!(err.as_label(), "action_bad_args");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::BadArgs { .. } => "action_bad_args",
            ActionError::Failed { .. } => "action_failed",
            ActionError::Timeout { .. } => "action_timeout",
            ActionError::Canceled => "action_canceled",
        }
    }
}

impl From<SessionError> for ActionError {
    fn from(err: SessionError) -> Self {
        ActionError::Failed {
            error: err.to_string(),
        }
    }
}

/// # Errors produced while loading or running a journey.
///
/// Loader errors (`BadJourney`, `BadSchedule`) are raised before anything is
/// dispatched. All other variants carry the [`Position`] of the task that
/// stopped the journey.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JourneyError {
    /// The journey document is not a JSON array of action descriptors.
    #[error("malformed journey: {reason}")]
    BadJourney {
        /// Parser or I/O message.
        reason: String,
    },

    /// A `start` specifier could not be parsed.
    #[error("action #{index} {action:?}: bad start {start:?}: {reason}")]
    BadSchedule {
        /// Descriptor index.
        index: usize,
        /// Descriptor action name.
        action: String,
        /// The raw specifier.
        start: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The action name is not present in the registry.
    #[error("{at}: unknown action")]
    UnknownAction {
        /// Where the journey stopped.
        at: Position,
    },

    /// The handler rejected its argument payload.
    #[error("{at}: bad args: {error}")]
    BadArgs {
        /// Where the journey stopped.
        at: Position,
        /// Decoder or validation message.
        error: String,
    },

    /// The handler reported a runtime failure.
    #[error("{at}: {source}")]
    ActionFailed {
        /// Where the journey stopped.
        at: Position,
        /// The handler error.
        #[source]
        source: ActionError,
    },

    /// The journey context was cancelled before or during a task.
    #[error("journey cancelled{}", describe_at(.at))]
    Cancelled {
        /// The task that was running or about to run, if any.
        at: Option<Position>,
    },

    /// Every action succeeded but some cleanup continuations failed.
    #[error("{count} cleanup continuation(s) failed")]
    CleanupFailed {
        /// Number of failed cleanups.
        count: usize,
    },

    /// A runner invariant was violated.
    #[error("internal error: {reason}")]
    Internal {
        /// Description of the broken invariant.
        reason: String,
    },
}

fn describe_at(at: &Option<Position>) -> String {
    match at {
        Some(pos) => format!(" ({pos})"),
        None => String::new(),
    }
}

impl JourneyError {
    /// Wraps a handler error with its journey position.
    pub fn from_action(at: Position, err: ActionError) -> Self {
        match err {
            ActionError::BadArgs { error } => JourneyError::BadArgs { at, error },
            ActionError::Canceled => JourneyError::Cancelled { at: Some(at) },
            source => JourneyError::ActionFailed { at, source },
        }
    }

    /// Returns the position of the failing task, if the error has one.
    pub fn position(&self) -> Option<&Position> {
        match self {
            JourneyError::UnknownAction { at }
            | JourneyError::BadArgs { at, .. }
            | JourneyError::ActionFailed { at, .. } => Some(at),
            JourneyError::Cancelled { at } => at.as_ref(),
            _ => None,
        }
    }

    /// True for errors raised before the scheduler starts.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            JourneyError::BadJourney { .. } | JourneyError::BadSchedule { .. }
        )
    }

    /// True when the journey stopped because its context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, JourneyError::Cancelled { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cuj_runner::JourneyError;
    ///
    /// let err = JourneyError::Cancelled { at: None };
    /// assert_eq!(err.as_label(), "journey_cancelled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JourneyError::BadJourney { .. } => "journey_bad_journey",
            JourneyError::BadSchedule { .. } => "journey_bad_schedule",
            JourneyError::UnknownAction { .. } => "journey_unknown_action",
            JourneyError::BadArgs { .. } => "journey_bad_args",
            JourneyError::ActionFailed { .. } => "journey_action_failed",
            JourneyError::Cancelled { .. } => "journey_cancelled",
            JourneyError::CleanupFailed { .. } => "journey_cleanup_failed",
            JourneyError::Internal { .. } => "journey_internal",
        }
    }
}

/// A cleanup continuation that returned an error while the journey unwound.
#[derive(Debug)]
pub struct CleanupFailure {
    /// Action whose handler registered the cleanup.
    pub action: Arc<str>,
    /// Descriptor index of that action.
    pub index: usize,
    /// What the cleanup reported.
    pub error: ActionError,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cleanup of action #{} {:?}: {}",
            self.index, self.action, self.error
        )
    }
}

/// Error returned by [`Runner::run`](crate::Runner::run).
///
/// The primary failure is never replaced by cleanup failures; those are
/// attached alongside it.
#[derive(Error, Debug)]
#[error("{error}{}", describe_cleanup(.cleanup))]
pub struct RunError {
    /// The failure that stopped the journey.
    #[source]
    pub error: JourneyError,
    /// Cleanup continuations that failed while unwinding, in the order they ran.
    pub cleanup: Vec<CleanupFailure>,
}

fn describe_cleanup(cleanup: &[CleanupFailure]) -> String {
    match cleanup.len() {
        0 => String::new(),
        n => format!(" (+{n} cleanup failure(s))"),
    }
}

impl RunError {
    pub fn new(error: JourneyError) -> Self {
        Self {
            error,
            cleanup: Vec::new(),
        }
    }
}

impl From<JourneyError> for RunError {
    fn from(error: JourneyError) -> Self {
        RunError::new(error)
    }
}

/// # Errors produced by a UI automation session.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// The endpoint could not be opened.
    #[error("cannot connect to {endpoint:?}: {reason}")]
    Connect {
        /// The endpoint as given by the caller.
        endpoint: String,
        /// Why the connection failed.
        reason: String,
    },

    /// Transport failure.
    #[error("session i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The backend sent something the client does not understand.
    #[error("session protocol error: {reason}")]
    Protocol {
        /// What was wrong with the exchange.
        reason: String,
    },

    /// The backend refused a primitive.
    #[error("session rejected {op}: {reason}")]
    Rejected {
        /// Primitive name.
        op: &'static str,
        /// Backend-provided message.
        reason: String,
    },

    /// The backend does not implement a primitive.
    #[error("{op} is not supported by this session")]
    Unsupported {
        /// Primitive name.
        op: &'static str,
    },
}

impl SessionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::Connect { .. } => "session_connect",
            SessionError::Io(_) => "session_io",
            SessionError::Protocol { .. } => "session_protocol",
            SessionError::Rejected { .. } => "session_rejected",
            SessionError::Unsupported { .. } => "session_unsupported",
        }
    }
}

/// # Errors produced while populating an action registry.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The name is already bound to a handler.
    #[error("action {name:?} is already registered")]
    Duplicate {
        /// The conflicting name.
        name: String,
    },

    /// Action names must be non-empty.
    #[error("action name must not be empty")]
    EmptyName,
}

/// # Errors produced by the metrics recorder and perf values.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MetricsError {
    /// `start` was called on a running recorder.
    #[error("recorder already started")]
    AlreadyStarted,

    /// `stop` was called on a stopped recorder.
    #[error("recorder not started")]
    NotStarted,

    /// A histogram lost samples between two snapshots.
    #[error("histogram {name:?} shrank between snapshots")]
    Shrunk {
        /// Histogram name.
        name: String,
    },

    /// Sampling was interrupted by context cancellation.
    #[error("sampling cancelled")]
    Cancelled,

    /// The histogram source failed.
    #[error("histogram source: {0}")]
    Session(#[from] SessionError),

    /// `append` on a single-valued metric, or `merge` of a single-valued metric already present.
    #[error("metric {name:?} is single-valued")]
    SingleValued {
        /// Metric name.
        name: String,
    },

    /// A metric name, variant, unit or recorder configuration was rejected.
    #[error("invalid metric {name:?}: {reason}")]
    InvalidMetric {
        /// Offending name.
        name: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Writing an output file failed.
    #[error("metrics i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding histogram export failed.
    #[error("metrics encoding: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetricsError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MetricsError::AlreadyStarted => "metrics_already_started",
            MetricsError::NotStarted => "metrics_not_started",
            MetricsError::Shrunk { .. } => "metrics_shrunk",
            MetricsError::Cancelled => "metrics_cancelled",
            MetricsError::Session(_) => "metrics_session",
            MetricsError::SingleValued { .. } => "metrics_single_valued",
            MetricsError::InvalidMetric { .. } => "metrics_invalid_metric",
            MetricsError::Io(_) => "metrics_io",
            MetricsError::Json(_) => "metrics_json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new("ClickUI", 1, Duration::from_millis(110))
    }

    #[test]
    fn test_from_action_maps_kinds() {
        let err = JourneyError::from_action(pos(), ActionError::bad_args("no predicate"));
        assert_eq!(err.as_label(), "journey_bad_args");

        let err = JourneyError::from_action(pos(), ActionError::failed("boom"));
        assert_eq!(err.as_label(), "journey_action_failed");
        assert_eq!(err.position().map(|p| p.index), Some(1));

        let err = JourneyError::from_action(pos(), ActionError::Canceled);
        assert!(err.is_cancelled());
        assert_eq!(err.position().map(|p| &*p.action), Some("ClickUI"));
    }

    #[test]
    fn test_display_carries_position() {
        let err = JourneyError::UnknownAction { at: pos() };
        let text = err.to_string();
        assert!(text.contains("#1"), "{text}");
        assert!(text.contains("ClickUI"), "{text}");

        let cancelled = JourneyError::Cancelled { at: None };
        assert_eq!(cancelled.to_string(), "journey cancelled");
    }

    #[test]
    fn test_run_error_mentions_cleanup_failures() {
        let err = RunError {
            error: JourneyError::ActionFailed {
                at: pos(),
                source: ActionError::failed("boom"),
            },
            cleanup: vec![CleanupFailure {
                action: "OpenUrl".into(),
                index: 0,
                error: ActionError::failed("tab gone"),
            }],
        };
        let text = err.to_string();
        assert!(text.contains("boom"), "{text}");
        assert!(text.contains("+1 cleanup failure"), "{text}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_session_error_becomes_action_failure() {
        let err: ActionError = SessionError::Unsupported { op: "click" }.into();
        assert_eq!(err.as_label(), "action_failed");
        assert!(err.to_string().contains("click"));
    }

    #[test]
    fn test_load_errors_are_classified() {
        let err = JourneyError::BadSchedule {
            index: 0,
            action: "A".into(),
            start: "soon".into(),
            reason: "missing number".into(),
        };
        assert!(err.is_load_error());
        assert!(err.position().is_none());
    }
}
