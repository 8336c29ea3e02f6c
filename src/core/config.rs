//! # Runner configuration.
//!
//! [`RunnerConfig`] holds the knobs of a [`Runner`](crate::Runner).
//!
//! ## Sentinel values
//! - `cleanup_timeout = 0s` → cleanups may run for as long as they need
//! - `bus_capacity` is clamped to at least 1
//!
//! The journey-wide deadline is not part of the config: it belongs to the
//! caller's cancellation token (see [`cancel_after`](crate::core::cancel_after)).

use std::sync::Arc;
use std::time::Duration;

/// Settings for a [`Runner`](crate::Runner).
#[derive(Clone)]
pub struct RunnerConfig {
    /// Upper bound for each cleanup continuation (`0s` = unbounded).
    ///
    /// Cleanup tokens are never cancelled by the journey; only this bound stops them.
    pub cleanup_timeout: Duration,

    /// Capacity of the event bus created by the reference binary.
    pub bus_capacity: usize,

    /// Secret handed to unlock-style actions through
    /// [`ActionContext::credential`](crate::ActionContext::credential).
    pub credential: Option<Arc<str>>,
}

impl RunnerConfig {
    /// Per-cleanup timeout as an `Option` (`None` = unbounded).
    #[inline]
    pub fn cleanup_timeout(&self) -> Option<Duration> {
        if self.cleanup_timeout == Duration::ZERO {
            None
        } else {
            Some(self.cleanup_timeout)
        }
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    pub fn with_credential(mut self, credential: impl Into<Arc<str>>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

impl Default for RunnerConfig {
    /// - `cleanup_timeout = 10s`
    /// - `bus_capacity = 1024`
    /// - no credential
    fn default() -> Self {
        Self {
            cleanup_timeout: Duration::from_secs(10),
            bus_capacity: 1024,
            credential: None,
        }
    }
}

impl std::fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("cleanup_timeout", &self.cleanup_timeout)
            .field("bus_capacity", &self.bus_capacity)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
