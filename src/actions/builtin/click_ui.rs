use async_trait::async_trait;

use super::until_cancelled;
use crate::actions::{Action, ActionContext, IntoOutcome, Outcome};
use crate::error::ActionError;
use crate::journey::Args;
use crate::session::{NodeQuery, SessionRef};

/// Clicks the node matching every given predicate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClickUi;

#[async_trait]
impl Action for ClickUi {
    fn name(&self) -> &str {
        "ClickUI"
    }

    async fn run(&self, ctx: &ActionContext, session: &SessionRef, args: &Args) -> Outcome {
        let query: NodeQuery = match args.parse() {
            Ok(q) => q,
            Err(e) => return Outcome::failed(e),
        };
        if query.is_empty() {
            return Outcome::failed(ActionError::bad_args(
                "at least one of role, name, class_name is required",
            ));
        }
        until_cancelled(&ctx.token, session.click(&query))
            .await
            .into_outcome()
    }
}
