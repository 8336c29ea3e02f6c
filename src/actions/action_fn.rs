//! # Function-backed action (`ActionFn`)
//!
//! [`ActionFn`] wraps a closure `F: Fn(ActionContext, SessionRef, Args) -> Fut`,
//! producing a fresh future per dispatch. The closure may return any
//! [`IntoOutcome`] shape: `Result<(), ActionError>`, `Result<Cleanup, _>`,
//! `Result<Option<Cleanup>, _>`, `(Option<Cleanup>, Result<(), _>)` or an
//! [`Outcome`].
//!
//! ## Example
//! ```rust
//! use cuj_runner::{ActionContext, ActionError, ActionFn, ActionRef, Args};
//! use cuj_runner::session::SessionRef;
//!
//! let wait: ActionRef = ActionFn::arc("Wait", |ctx: ActionContext, _s: SessionRef, _a: Args| async move {
//!     if ctx.is_cancelled() {
//!         return Err(ActionError::Canceled);
//!     }
//!     Ok(())
//! });
//!
//! assert_eq!(wait.name(), "Wait");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::actions::{Action, ActionContext, IntoOutcome, Outcome};
use crate::journey::Args;
use crate::session::SessionRef;

/// Function-backed action implementation.
#[derive(Debug)]
pub struct ActionFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ActionFn<F> {
    /// Prefer [`ActionFn::arc`] when you immediately need an [`ActionRef`](crate::ActionRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut, O> Action for ActionFn<F>
where
    F: Fn(ActionContext, SessionRef, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send,
    O: IntoOutcome + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &ActionContext, session: &SessionRef, args: &Args) -> Outcome {
        (self.f)(ctx.clone(), Arc::clone(session), args.clone())
            .await
            .into_outcome()
    }
}
