use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::until_cancelled;
use crate::actions::{Action, ActionContext, Cleanup, Outcome};
use crate::error::ActionError;
use crate::journey::Args;
use crate::session::SessionRef;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OpenUrlArgs {
    url: String,
}

/// Opens `url` in a new tab; the cleanup closes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenUrl;

#[async_trait]
impl Action for OpenUrl {
    fn name(&self) -> &str {
        "OpenUrl"
    }

    async fn run(&self, ctx: &ActionContext, session: &SessionRef, args: &Args) -> Outcome {
        let OpenUrlArgs { url } = match args.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Outcome::failed(e),
        };
        if url.trim().is_empty() {
            return Outcome::failed(ActionError::bad_args("url must not be empty"));
        }

        let tab = match until_cancelled(&ctx.token, session.open_url(&url)).await {
            Ok(tab) => tab,
            Err(e) => return Outcome::failed(e),
        };
        debug!(%url, %tab, "tab opened");

        let session = Arc::clone(session);
        Outcome::with_cleanup(Cleanup::new(move |token| async move {
            until_cancelled(&token, session.close_tab(tab)).await
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{DryRunSession, SessionCall};
    use tokio_util::sync::CancellationToken;

    fn dry() -> (Arc<DryRunSession>, SessionRef) {
        let s = Arc::new(DryRunSession::new("dryrun://open-url"));
        let r: SessionRef = s.clone();
        (s, r)
    }

    #[tokio::test]
    async fn test_opens_and_cleanup_closes() {
        let (dry, session) = dry();
        let ctx = ActionContext::new(CancellationToken::new());
        let args = Args::from_json(r#"{"url":"https://example.test/"}"#).unwrap();

        let (cleanup, result) = OpenUrl.run(&ctx, &session, &args).await.into_parts();
        result.unwrap();
        cleanup.unwrap().call(CancellationToken::new()).await.unwrap();

        let calls = dry.calls();
        assert_eq!(calls.len(), 2);
        match (&calls[0], &calls[1]) {
            (SessionCall::OpenUrl { url, tab }, SessionCall::CloseTab(closed)) => {
                assert_eq!(url, "https://example.test/");
                assert_eq!(tab, closed);
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_args() {
        let (dry, session) = dry();
        let ctx = ActionContext::new(CancellationToken::new());
        for raw in [r#"{"url":""}"#, r#"{"href":"x"}"#, "42"] {
            let out = OpenUrl.run(&ctx, &session, &Args::from_json(raw).unwrap()).await;
            assert!(out.cleanup.is_none());
            assert_eq!(out.result.unwrap_err().as_label(), "action_bad_args", "{raw}");
        }
        let out = OpenUrl.run(&ctx, &session, &Args::none()).await;
        assert!(out.result.is_err());
        assert!(dry.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_context_opens_nothing() {
        let (dry, session) = dry();
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ActionContext::new(token);
        let args = Args::from_json(r#"{"url":"https://example.test/"}"#).unwrap();
        let out = OpenUrl.run(&ctx, &session, &args).await;
        assert_eq!(out.result.unwrap_err().as_label(), "action_canceled");
        assert!(dry.calls().is_empty());
    }
}
