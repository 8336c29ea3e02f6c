//! UI session boundary and the bundled backends.
//!
//! ## Endpoints
//! ```text
//! dryrun://<label>    → DryRunSession  (logs and records, performs nothing)
//! tcp://<host>:<port> → RemoteSession  (line-delimited JSON RPC)
//! ```

mod backend;
mod dry_run;
mod remote;

pub use backend::{DEFAULT_AUTH_TIMEOUT, NodeQuery, Session, SessionRef, TabId};
pub use dry_run::{DryRunSession, SessionCall};
pub use remote::RemoteSession;

use std::sync::Arc;

use crate::error::SessionError;

/// Opens a session for `endpoint`.
///
/// # Example
/// ```
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let session = cuj_runner::session::connect("dryrun://demo").await.unwrap();
///     assert_eq!(session.endpoint(), "dryrun://demo");
///     assert!(cuj_runner::session::connect("ftp://nope").await.is_err());
/// }
/// ```
pub async fn connect(endpoint: &str) -> Result<SessionRef, SessionError> {
    if endpoint == "dryrun" || endpoint.starts_with("dryrun://") {
        return Ok(Arc::new(DryRunSession::new(endpoint)));
    }
    if let Some(addr) = endpoint.strip_prefix("tcp://") {
        if addr.is_empty() {
            return Err(SessionError::Connect {
                endpoint: endpoint.to_string(),
                reason: "missing host:port".into(),
            });
        }
        return Ok(Arc::new(RemoteSession::connect(endpoint, addr).await?));
    }
    Err(SessionError::Connect {
        endpoint: endpoint.to_string(),
        reason: "unsupported scheme (expected dryrun:// or tcp://)".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_dispatches_on_scheme() {
        let s = connect("dryrun://unit").await.unwrap();
        assert_eq!(s.endpoint(), "dryrun://unit");

        for bad in ["ftp://x", "tcp://", "", "localhost:9000"] {
            let err = connect(bad).await.err().unwrap();
            assert_eq!(err.as_label(), "session_connect", "{bad}");
        }
    }
}
