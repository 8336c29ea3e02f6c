//! # UI automation backend boundary.
//!
//! [`Session`] is the only way handlers touch the system under test. The
//! runner never calls it directly; built-in actions and caller handlers do.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::metrics::Histogram;

/// Auth window used when the backend does not announce one.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend-assigned browser tab handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

/// Intersection of optional predicates locating one UI node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl NodeQuery {
    /// True when no predicate is set to a non-empty value.
    pub fn is_empty(&self) -> bool {
        [&self.role, &self.name, &self.class_name]
            .iter()
            .all(|p| p.as_deref().is_none_or(str::is_empty))
    }
}

impl fmt::Display for NodeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(role) = self.role.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("role={role}"));
        }
        if let Some(name) = self.name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("name={name:?}"));
        }
        if let Some(class) = self.class_name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("class={class}"));
        }
        write!(f, "{{{}}}", parts.join(" "))
    }
}

/// # Live UI session.
///
/// Used serially: the runner never dispatches two handlers at once, so
/// implementations only need interior mutability for their own bookkeeping.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// Endpoint this session was opened from.
    fn endpoint(&self) -> &str;

    async fn open_url(&self, url: &str) -> Result<TabId, SessionError>;

    async fn close_tab(&self, tab: TabId) -> Result<(), SessionError>;

    async fn lock_screen(&self) -> Result<(), SessionError>;

    async fn unlock_screen(&self, credential: &str) -> Result<(), SessionError>;

    async fn click(&self, query: &NodeQuery) -> Result<(), SessionError>;

    /// How long an unlock may take.
    fn auth_timeout(&self) -> Duration {
        DEFAULT_AUTH_TIMEOUT
    }

    /// Cumulative snapshots of the named histograms.
    async fn histograms(&self, _names: &[String]) -> Result<Vec<Histogram>, SessionError> {
        Err(SessionError::Unsupported { op: "histograms" })
    }
}

/// Shared handle to a session.
pub type SessionRef = Arc<dyn Session>;
