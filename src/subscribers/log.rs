//! # Logging subscriber.
//!
//! [`LogWriter`] turns runner events into `tracing` records under the
//! `cuj_runner::events` target:
//!
//! ```text
//! INFO  journey_starting tasks=3
//! DEBUG action_scheduled action=OpenUrl index=0 offset=0ns
//! INFO  action_starting action=OpenUrl index=0 offset=1.2ms
//! WARN  action_failed action=ClickUI index=2 offset=2.1s reason="..."
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Writes every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let kind = e.kind.as_label();
        let action = e.action.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let offset = e.offset.unwrap_or_default();

        match e.kind {
            EventKind::JourneyStarting => {
                info!(target: "cuj_runner::events", seq = e.seq, reason, "{kind}");
            }
            EventKind::JourneyFinished if e.reason.is_none() => {
                info!(target: "cuj_runner::events", seq = e.seq, ?offset, "{kind}");
            }
            EventKind::ActionScheduled => {
                debug!(target: "cuj_runner::events", seq = e.seq, action, index = e.index, ?offset, "{kind}");
            }
            EventKind::ActionStarting | EventKind::ActionCompleted => {
                info!(target: "cuj_runner::events", seq = e.seq, action, index = e.index, ?offset, "{kind}");
            }
            _ => {
                warn!(target: "cuj_runner::events", seq = e.seq, action, index = e.index, ?offset, reason, "{kind}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
