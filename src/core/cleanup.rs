//! # Cleanup stack.
//!
//! Continuations are pushed as handlers return them and drained once, in
//! reverse order, when the run ends for any reason.
//!
//! Each continuation gets a fresh token, live even after the journey token
//! fired, and is bounded by the optional timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::actions::Cleanup;
use crate::error::{ActionError, CleanupFailure};
use crate::events::{Bus, Event, EventKind};

struct Entry {
    action: Arc<str>,
    index: usize,
    cleanup: Cleanup,
}

#[derive(Default)]
pub(crate) struct CleanupStack {
    entries: Vec<Entry>,
}

impl CleanupStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, action: Arc<str>, index: usize, cleanup: Cleanup) {
        self.entries.push(Entry {
            action,
            index,
            cleanup,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Runs every continuation, last pushed first, and returns the failures
    /// in the order they ran.
    pub(crate) async fn drain(
        mut self,
        timeout: Option<Duration>,
        bus: &Bus,
    ) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();

        while let Some(Entry {
            action,
            index,
            cleanup,
        }) = self.entries.pop()
        {
            let token = CancellationToken::new();
            let res = match timeout {
                Some(dur) => match time::timeout(dur, cleanup.call(token.clone())).await {
                    Ok(r) => r,
                    Err(_elapsed) => {
                        token.cancel();
                        Err(ActionError::Timeout { timeout: dur })
                    }
                },
                None => cleanup.call(token).await,
            };

            match res {
                Ok(()) => debug!(%action, index, "cleanup done"),
                Err(error) => {
                    warn!(%action, index, %error, "cleanup failed");
                    bus.publish(
                        Event::new(EventKind::CleanupFailed)
                            .with_action(Arc::clone(&action), index)
                            .with_reason(error.to_string()),
                    );
                    failures.push(CleanupFailure {
                        action,
                        index,
                        error,
                    });
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(log: &Arc<Mutex<Vec<usize>>>, n: usize, fail: bool) -> Cleanup {
        let log = Arc::clone(log);
        Cleanup::new(move |_token| async move {
            log.lock().unwrap().push(n);
            if fail {
                Err(ActionError::failed(format!("cleanup {n}")))
            } else {
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_drains_lifo_and_collects_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CleanupStack::new();
        for n in 0..4 {
            stack.push("A".into(), n, recording(&log, n, n % 2 == 1));
        }
        assert_eq!(stack.len(), 4);

        let failures = stack.drain(None, &Bus::new(1)).await;
        assert_eq!(*log.lock().unwrap(), vec![3, 2, 1, 0]);
        let failed: Vec<usize> = failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![3, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_cleanup_times_out() {
        let mut stack = CleanupStack::new();
        stack.push(
            "Stuck".into(),
            0,
            Cleanup::new(|token| async move {
                token.cancelled().await;
                Ok(())
            }),
        );
        let failures = stack.drain(Some(Duration::from_secs(3)), &Bus::new(1)).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error.as_label(), "action_timeout");
    }

    #[tokio::test]
    async fn test_cleanup_token_is_live() {
        let mut stack = CleanupStack::new();
        stack.push(
            "Probe".into(),
            0,
            Cleanup::new(|token| async move {
                if token.is_cancelled() {
                    Err(ActionError::Canceled)
                } else {
                    Ok(())
                }
            }),
        );
        assert!(stack.drain(None, &Bus::new(1)).await.is_empty());
    }
}
