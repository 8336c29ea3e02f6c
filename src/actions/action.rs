//! # Action abstraction.
//!
//! An [`Action`] is one kind of journey step, bound to a name in the
//! [`Registry`](crate::Registry). The runner hands it an [`ActionContext`],
//! the caller's session, and the descriptor's raw [`Args`].
//!
//! A handler reports an [`Outcome`]: an optional [`Cleanup`] continuation and
//! a result. Both may be present: a handler that acquired a resource and then
//! failed still returns the continuation that releases it.
//!
//! ```text
//! run(ctx, session, args) ──► Outcome { cleanup, result }
//!                                 │          │
//!                                 │          └─► Err → journey stops
//!                                 └─► pushed on the cleanup stack (LIFO)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::ActionError;
use crate::journey::Args;
use crate::session::SessionRef;

/// Per-dispatch context handed to a handler.
#[derive(Clone, Debug)]
pub struct ActionContext {
    /// Journey cancellation token. Handlers must observe it.
    pub token: CancellationToken,
    /// Secret used by unlock-style actions.
    pub credential: Option<Arc<str>>,
    /// Descriptor index of the running task.
    pub index: usize,
    /// Time since journey start at dispatch.
    pub since_start: Duration,
}

impl ActionContext {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            credential: None,
            index: 0,
            since_start: Duration::ZERO,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the journey is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// # Asynchronous, cancelable journey step.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use cuj_runner::{Action, ActionContext, ActionError, Args, Outcome};
/// use cuj_runner::session::SessionRef;
///
/// struct Pause;
///
/// #[async_trait]
/// impl Action for Pause {
///     fn name(&self) -> &str { "Pause" }
///
///     async fn run(&self, ctx: &ActionContext, _s: &SessionRef, _a: &Args) -> Outcome {
///         if ctx.is_cancelled() {
///             return Outcome::failed(ActionError::Canceled);
///         }
///         Outcome::ok()
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Registry key.
    fn name(&self) -> &str;

    /// Performs the step.
    async fn run(&self, ctx: &ActionContext, session: &SessionRef, args: &Args) -> Outcome;
}

/// Shared handle to an action.
pub type ActionRef = Arc<dyn Action>;

type CleanupFn = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), ActionError>> + Send>;

/// Deferred release of something a handler acquired.
///
/// Called exactly once, after every later action's cleanup.
pub struct Cleanup(CleanupFn);

impl Cleanup {
    /// Wraps a closure producing the release future.
    ///
    /// The closure receives a token that stays live even after the journey
    /// was cancelled.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Self(Box::new(move |token| Box::pin(f(token))))
    }

    pub(crate) async fn call(self, token: CancellationToken) -> Result<(), ActionError> {
        (self.0)(token).await
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// What a handler reports.
#[derive(Debug)]
#[must_use]
pub struct Outcome {
    pub cleanup: Option<Cleanup>,
    pub result: Result<(), ActionError>,
}

impl Outcome {
    /// Success without cleanup.
    pub fn ok() -> Self {
        Self {
            cleanup: None,
            result: Ok(()),
        }
    }

    /// Success with a cleanup continuation.
    pub fn with_cleanup(cleanup: Cleanup) -> Self {
        Self {
            cleanup: Some(cleanup),
            result: Ok(()),
        }
    }

    /// Failure before anything needed releasing.
    pub fn failed(err: ActionError) -> Self {
        Self {
            cleanup: None,
            result: Err(err),
        }
    }

    /// Failure after acquiring something that still needs releasing.
    pub fn partial(cleanup: Cleanup, err: ActionError) -> Self {
        Self {
            cleanup: Some(cleanup),
            result: Err(err),
        }
    }

    pub fn into_parts(self) -> (Option<Cleanup>, Result<(), ActionError>) {
        (self.cleanup, self.result)
    }
}

/// Handler return shapes accepted by [`ActionFn`](crate::ActionFn).
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl IntoOutcome for Result<(), ActionError> {
    fn into_outcome(self) -> Outcome {
        Outcome {
            cleanup: None,
            result: self,
        }
    }
}

impl IntoOutcome for Result<Cleanup, ActionError> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(cleanup) => Outcome::with_cleanup(cleanup),
            Err(err) => Outcome::failed(err),
        }
    }
}

impl IntoOutcome for Result<Option<Cleanup>, ActionError> {
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(cleanup) => Outcome {
                cleanup,
                result: Ok(()),
            },
            Err(err) => Outcome::failed(err),
        }
    }
}

impl IntoOutcome for (Option<Cleanup>, Result<(), ActionError>) {
    fn into_outcome(self) -> Outcome {
        Outcome {
            cleanup: self.0,
            result: self.1,
        }
    }
}
