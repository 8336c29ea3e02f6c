use async_trait::async_trait;
use tokio::time;

use super::until_cancelled;
use crate::actions::{Action, ActionContext, IntoOutcome, Outcome};
use crate::error::ActionError;
use crate::journey::Args;
use crate::session::SessionRef;

/// Locks the screen.
#[derive(Debug, Default, Clone, Copy)]
pub struct LockScreen;

#[async_trait]
impl Action for LockScreen {
    fn name(&self) -> &str {
        "LockScreen"
    }

    async fn run(&self, ctx: &ActionContext, session: &SessionRef, _args: &Args) -> Outcome {
        until_cancelled(&ctx.token, session.lock_screen())
            .await
            .into_outcome()
    }
}

/// Unlocks the screen with the journey credential.
///
/// Bounded by the session's auth window.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlockScreen;

#[async_trait]
impl Action for UnlockScreen {
    fn name(&self) -> &str {
        "UnlockScreen"
    }

    async fn run(&self, ctx: &ActionContext, session: &SessionRef, _args: &Args) -> Outcome {
        let Some(credential) = ctx.credential.as_deref() else {
            return Outcome::failed(ActionError::bad_args("no credential configured for UnlockScreen"));
        };

        let window = session.auth_timeout();
        match time::timeout(window, until_cancelled(&ctx.token, session.unlock_screen(credential))).await {
            Ok(res) => res.into_outcome(),
            Err(_elapsed) => Outcome::failed(ActionError::Timeout { timeout: window }),
        }
    }
}
