//! # Dispatch of a single task.
//!
//! [`run_once`] invokes one handler and turns its [`Outcome`](crate::Outcome) into what the
//! scheduler needs: the cleanup continuation, if any, and a result already
//! annotated with the task's journey [`Position`].
//!
//! ## Event flow
//! ```text
//! publish ActionStarting
//!   └─► action.run(ctx, session, args)
//!          ├─ Ok            → publish ActionCompleted
//!          ├─ Err(Canceled) → (no event; the journey reports the cancellation)
//!          └─ Err(e)        → publish ActionFailed
//! ```
//!
//! ## Rules
//! - No retries.
//! - The handler gets a child of the journey token.
//! - The cleanup is returned even when the handler failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::actions::{Action, ActionContext, Cleanup};
use crate::error::{ActionError, JourneyError, Position};
use crate::events::{Bus, Event, EventKind};
use crate::journey::Task;
use crate::session::SessionRef;

/// Journey-wide inputs shared by every dispatch.
pub(crate) struct DispatchEnv<'a> {
    pub token: &'a CancellationToken,
    pub session: &'a SessionRef,
    pub credential: Option<&'a Arc<str>>,
    pub started: Instant,
    pub bus: &'a Bus,
}

/// Runs `task` once with `action`.
pub(crate) async fn run_once(
    action: &dyn Action,
    task: &Task,
    env: &DispatchEnv<'_>,
) -> (Option<Cleanup>, Result<(), JourneyError>) {
    let since_start = env.started.elapsed();
    let ctx = ActionContext {
        token: env.token.child_token(),
        credential: env.credential.cloned(),
        index: task.index,
        since_start,
    };

    env.bus.publish(
        Event::new(EventKind::ActionStarting)
            .with_action(task.action.clone(), task.index)
            .with_offset(since_start),
    );

    let (cleanup, res) = action
        .run(&ctx, env.session, &task.args)
        .await
        .into_parts();

    let now = env.started.elapsed();
    let res = match res {
        Ok(()) => {
            publish_completed(env.bus, task, now);
            Ok(())
        }
        Err(err) => {
            if !matches!(err, ActionError::Canceled) {
                publish_failed(env.bus, task, now, &err.to_string());
            }
            Err(JourneyError::from_action(position(task, now), err))
        }
    };
    (cleanup, res)
}

pub(crate) fn position(task: &Task, since_start: Duration) -> Position {
    Position::new(task.action.clone(), task.index, since_start)
}

fn publish_completed(bus: &Bus, task: &Task, at: Duration) {
    bus.publish(
        Event::new(EventKind::ActionCompleted)
            .with_action(task.action.clone(), task.index)
            .with_offset(at),
    );
}

pub(crate) fn publish_failed(bus: &Bus, task: &Task, at: Duration, reason: &str) {
    bus.publish(
        Event::new(EventKind::ActionFailed)
            .with_action(task.action.clone(), task.index)
            .with_offset(at)
            .with_reason(reason),
    );
}
