//! # In-process session that performs nothing.
//!
//! [`DryRunSession`] logs every primitive, records it for inspection, and
//! reports success. It backs `dryrun://` endpoints and the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SessionError;
use crate::metrics::Histogram;
use crate::session::{DEFAULT_AUTH_TIMEOUT, NodeQuery, Session, TabId};

/// A primitive received by a [`DryRunSession`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCall {
    OpenUrl { url: String, tab: TabId },
    CloseTab(TabId),
    LockScreen,
    UnlockScreen,
    Click(NodeQuery),
}

/// Session that records calls instead of driving a UI.
#[derive(Debug)]
pub struct DryRunSession {
    endpoint: String,
    auth_timeout: Duration,
    next_tab: AtomicU64,
    calls: Mutex<Vec<SessionCall>>,
    histograms: Mutex<HashMap<String, Histogram>>,
}

impl DryRunSession {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            next_tab: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Primitives received so far, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        lock(&self.calls).clone()
    }

    /// Replaces the snapshot returned for `hist.name`.
    pub fn set_histogram(&self, hist: Histogram) {
        lock(&self.histograms).insert(hist.name.clone(), hist);
    }

    fn record(&self, call: SessionCall) {
        debug!(endpoint = %self.endpoint, ?call, "dry-run primitive");
        lock(&self.calls).push(call);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Session for DryRunSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_url(&self, url: &str) -> Result<TabId, SessionError> {
        let tab = TabId(self.next_tab.fetch_add(1, Ordering::Relaxed));
        self.record(SessionCall::OpenUrl {
            url: url.to_string(),
            tab,
        });
        Ok(tab)
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), SessionError> {
        self.record(SessionCall::CloseTab(tab));
        Ok(())
    }

    async fn lock_screen(&self) -> Result<(), SessionError> {
        self.record(SessionCall::LockScreen);
        Ok(())
    }

    async fn unlock_screen(&self, _credential: &str) -> Result<(), SessionError> {
        self.record(SessionCall::UnlockScreen);
        Ok(())
    }

    async fn click(&self, query: &NodeQuery) -> Result<(), SessionError> {
        self.record(SessionCall::Click(query.clone()));
        Ok(())
    }

    fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }

    async fn histograms(&self, names: &[String]) -> Result<Vec<Histogram>, SessionError> {
        let known = lock(&self.histograms);
        Ok(names
            .iter()
            .map(|n| known.get(n).cloned().unwrap_or_else(|| Histogram::empty(n.as_str())))
            .collect())
    }
}
