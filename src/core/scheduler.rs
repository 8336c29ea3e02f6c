//! # Journey scheduler.
//!
//! [`Runner`] drives one [`Journey`] against one session on the calling task.
//! It yields only while sleeping until the next task, while a handler runs,
//! and while cleanups run.
//!
//! ## Architecture
//! ```text
//! Journey::initial_order() ──► ReadyQueue (min st, then insertion)
//!                                   │ pop
//!                                   ▼
//!            select! { token.cancelled() → Cancelled
//!                      sleep_until(start + st) }
//!                                   │
//!                      registry.get(action) ── None → UnknownAction
//!                                   │
//!                         run_once(action, task)
//!                          │                │
//!               Some(cleanup) → CleanupStack      Err → stop
//!                                   │
//!          task.blocked? → push(dependent, elapsed + dependent.rt)
//!
//! on exit (any path): CleanupStack::drain (LIFO)
//! ```
//!
//! ## Rules
//! - Independent tasks dispatch in ascending `st`; equal `st` keeps journey order.
//! - A dependent task is rebased on its predecessor's actual completion.
//! - After the first error nothing else is dispatched; cleanups still run.
//! - The run is a function of (journey, registry, token, session) only.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use cuj_runner::{ActionContext, ActionError, Args, Journey, Registry, Runner};
//! use cuj_runner::session::{DryRunSession, SessionRef};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut registry = Registry::new();
//!     registry
//!         .register_fn("Noop", |_c: ActionContext, _s: SessionRef, _a: Args| async {
//!             Ok::<(), ActionError>(())
//!         })
//!         .unwrap();
//!
//!     let journey = Journey::from_json(r#"[{"action":"Noop"},{"action":"Noop","start":"+5ms"}]"#).unwrap();
//!     let session: SessionRef = Arc::new(DryRunSession::new("dryrun://"));
//!
//!     let report = Runner::new(registry)
//!         .run(&journey, &CancellationToken::new(), &session)
//!         .await
//!         .unwrap();
//!     assert_eq!(report.order(), vec![0, 1]);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::actions::Registry;
use crate::core::cleanup::CleanupStack;
use crate::core::config::RunnerConfig;
use crate::core::queue::ReadyQueue;
use crate::core::runner::{DispatchEnv, position, publish_failed, run_once};
use crate::error::{JourneyError, RunError};
use crate::events::{Bus, Event, EventKind};
use crate::journey::{Journey, Task};
use crate::session::SessionRef;

/// One handler invocation, as it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub index: usize,
    pub action: Arc<str>,
    /// Planned offset from journey start.
    pub scheduled: Duration,
    /// Actual offset at dispatch.
    pub started: Duration,
    /// Offset when the handler returned.
    pub finished: Duration,
}

/// Result of a successful run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    /// Dispatches in order.
    pub dispatched: Vec<Dispatch>,
    /// Wall time of the run, cleanups included.
    pub elapsed: Duration,
}

impl RunReport {
    /// Descriptor indices in dispatch order.
    pub fn order(&self) -> Vec<usize> {
        self.dispatched.iter().map(|d| d.index).collect()
    }
}

/// Journey scheduler.
#[derive(Clone, Debug)]
pub struct Runner {
    registry: Arc<Registry>,
    cfg: RunnerConfig,
    bus: Bus,
}

impl Runner {
    /// Runner with the default config.
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        Self::with_config(registry, RunnerConfig::default())
    }

    pub fn with_config(registry: impl Into<Arc<Registry>>, cfg: RunnerConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            registry: registry.into(),
            cfg,
            bus,
        }
    }

    /// Publishes events on `bus` instead of a private one.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = bus;
        self
    }

    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.cfg
    }

    /// Runs `journey` to completion, failure, or cancellation of `token`.
    ///
    /// Cleanups always run before this returns. On success with failed
    /// cleanups the error is [`JourneyError::CleanupFailed`]; otherwise the
    /// primary error is kept and cleanup failures ride along in
    /// [`RunError::cleanup`].
    pub async fn run(
        &self,
        journey: &Journey,
        token: &CancellationToken,
        session: &SessionRef,
    ) -> Result<RunReport, RunError> {
        let started = Instant::now();
        debug!(tasks = journey.len(), session = session.endpoint(), "journey starting");
        self.bus.publish(
            Event::new(EventKind::JourneyStarting).with_reason(format!("tasks={}", journey.len())),
        );

        let env = DispatchEnv {
            token,
            session,
            credential: self.cfg.credential.as_ref(),
            started,
            bus: &self.bus,
        };
        let mut cleanups = CleanupStack::new();
        let mut dispatched = Vec::with_capacity(journey.len());
        let outcome = self
            .drive(journey, &env, &mut cleanups, &mut dispatched)
            .await;

        let pending = cleanups.len();
        if pending > 0 {
            debug!(count = pending, "running cleanups");
        }
        let failures = cleanups
            .drain(self.cfg.cleanup_timeout(), &self.bus)
            .await;
        let elapsed = started.elapsed();

        let error = match outcome {
            Ok(()) if failures.is_empty() => {
                debug!(dispatched = dispatched.len(), ?elapsed, "journey finished");
                self.bus
                    .publish(Event::new(EventKind::JourneyFinished).with_offset(elapsed));
                return Ok(RunReport {
                    dispatched,
                    elapsed,
                });
            }
            Ok(()) => JourneyError::CleanupFailed {
                count: failures.len(),
            },
            Err(error) => error,
        };

        if error.is_cancelled() {
            debug!(error = %error, ?elapsed, "journey cancelled");
            self.bus
                .publish(Event::new(EventKind::JourneyCancelled).with_offset(elapsed));
        } else {
            debug!(error = %error, label = error.as_label(), ?elapsed, "journey failed");
            self.bus.publish(
                Event::new(EventKind::JourneyFinished)
                    .with_offset(elapsed)
                    .with_reason(error.to_string()),
            );
        }
        Err(RunError {
            error,
            cleanup: failures,
        })
    }

    async fn drive(
        &self,
        journey: &Journey,
        env: &DispatchEnv<'_>,
        cleanups: &mut CleanupStack,
        dispatched: &mut Vec<Dispatch>,
    ) -> Result<(), JourneyError> {
        let mut ready = ReadyQueue::new();
        for index in journey.initial_order() {
            let task = lookup(journey, index)?;
            ready.push(task.st, index);
            self.publish_scheduled(task.action.clone(), index, task.st);
        }

        while let Some((st, index)) = ready.pop() {
            let task = lookup(journey, index)?;

            tokio::select! {
                biased;
                _ = env.token.cancelled() => return Err(self.cancelled_at(task, env)),
                _ = time::sleep_until(env.started + st) => {}
            }

            let Some(action) = self.registry.get(&task.action) else {
                let now = env.started.elapsed();
                publish_failed(&self.bus, task, now, "unknown action");
                return Err(JourneyError::UnknownAction {
                    at: position(task, now),
                });
            };

            let begun = env.started.elapsed();
            debug!(action = %task.action, index, scheduled = ?st, started = ?begun, "dispatching");
            let (cleanup, res) = run_once(action.as_ref(), task, env).await;
            let finished = env.started.elapsed();

            if let Some(cleanup) = cleanup {
                cleanups.push(task.action.clone(), index, cleanup);
            }
            dispatched.push(Dispatch {
                index,
                action: task.action.clone(),
                scheduled: st,
                started: begun,
                finished,
            });
            res?;

            if let Some(next) = task.blocked {
                let dependent = lookup(journey, next)?;
                let at = finished + dependent.rt;
                ready.push(at, next);
                self.publish_scheduled(dependent.action.clone(), next, at);
            }
        }
        Ok(())
    }

    fn cancelled_at(&self, task: &Task, env: &DispatchEnv<'_>) -> JourneyError {
        JourneyError::Cancelled {
            at: Some(position(task, env.started.elapsed())),
        }
    }

    fn publish_scheduled(&self, action: Arc<str>, index: usize, at: Duration) {
        self.bus.publish(
            Event::new(EventKind::ActionScheduled)
                .with_action(action, index)
                .with_offset(at),
        );
    }
}

fn lookup(journey: &Journey, index: usize) -> Result<&Task, JourneyError> {
    journey.task(index).ok_or_else(|| JourneyError::Internal {
        reason: format!("task #{index} missing from journey of {}", journey.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::actions::{ActionContext, ActionFn, Cleanup, Outcome};
    use crate::error::ActionError;
    use crate::journey::Args;
    use crate::session::DryRunSession;

    type Log = Arc<Mutex<Vec<String>>>;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn session() -> SessionRef {
        Arc::new(DryRunSession::new("dryrun://scheduler"))
    }

    /// Handler that takes `work`, logs `run:<name>`, and registers a cleanup logging `clean:<name>`.
    fn timed(reg: &mut Registry, log: &Log, name: &'static str, work: Duration, fail: bool) {
        let log = Arc::clone(log);
        reg.register(ActionFn::arc(name, move |_c: ActionContext, _s: SessionRef, _a: Args| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("run:{name}"));
                if !work.is_zero() {
                    time::sleep(work).await;
                }
                let clean_log = Arc::clone(&log);
                let cleanup = Cleanup::new(move |_t| async move {
                    clean_log.lock().unwrap().push(format!("clean:{name}"));
                    Ok(())
                });
                if fail {
                    Outcome::partial(cleanup, ActionError::failed(format!("{name} broke")))
                } else {
                    Outcome::with_cleanup(cleanup)
                }
            }
        }))
        .unwrap();
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_absolute_schedule_order() {
        let log = Log::default();
        let mut reg = Registry::new();
        for name in ["A", "B", "C"] {
            timed(&mut reg, &log, name, Duration::ZERO, false);
        }
        let journey = Journey::from_json(
            r#"[{"action":"A","start":"0s"},{"action":"B","start":"100ms"},{"action":"C","start":"50ms"}]"#,
        )
        .unwrap();

        let report = Runner::new(reg)
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap();
        assert_eq!(report.order(), vec![0, 2, 1]);
        let started: Vec<Duration> = report.dispatched.iter().map(|d| d.started).collect();
        assert_eq!(started, vec![ms(0), ms(50), ms(100)]);
        assert_eq!(
            entries(&log),
            ["run:A", "run:C", "run:B", "clean:B", "clean:C", "clean:A"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependent_chain_rebases_on_completion() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "A", ms(100), false);
        timed(&mut reg, &log, "B", ms(30), false);
        timed(&mut reg, &log, "C", Duration::ZERO, false);
        let journey = Journey::from_json(
            r#"[{"action":"A","start":"0s"},{"action":"B","start":"+10ms"},{"action":"C","start":"+5ms"}]"#,
        )
        .unwrap();

        let report = Runner::new(reg)
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap();
        let started: Vec<Duration> = report.dispatched.iter().map(|d| d.started).collect();
        assert_eq!(started, vec![ms(0), ms(110), ms(145)]);
        for pair in report.dispatched.windows(2) {
            let rt = journey.task(pair[1].index).unwrap().rt;
            assert!(pair[1].started >= pair[0].finished + rt);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_dispatch_and_runs_cleanups() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "First", Duration::ZERO, false);
        timed(&mut reg, &log, "Second", ms(5), true);
        timed(&mut reg, &log, "Third", Duration::ZERO, false);
        let journey = Journey::from_json(
            r#"[{"action":"First","start":"0s"},{"action":"Second","start":"+1ms"},{"action":"Third","start":"+1ms"}]"#,
        )
        .unwrap();

        let err = Runner::new(reg)
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap_err();
        assert!(err.cleanup.is_empty());
        let at = err.error.position().unwrap();
        assert_eq!(&*at.action, "Second");
        assert_eq!(at.index, 1);
        assert_eq!(at.since_start, ms(6));
        assert_eq!(err.error.as_label(), "journey_action_failed");
        assert_eq!(
            entries(&log),
            ["run:First", "run:Second", "clean:Second", "clean:First"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_sleep() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "A", Duration::ZERO, false);
        timed(&mut reg, &log, "B", Duration::ZERO, false);
        let journey =
            Journey::from_json(r#"[{"action":"A","start":"0s"},{"action":"B","start":"+10s"}]"#).unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            time::sleep(ms(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = Runner::new(reg)
            .run(&journey, &token, &session())
            .await
            .unwrap_err();
        assert!(err.error.is_cancelled());
        assert_eq!(err.error.position().map(|p| p.index), Some(1));
        assert_eq!(started.elapsed(), ms(100));
        assert_eq!(entries(&log), ["run:A", "clean:A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_inside_handler() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "A", Duration::ZERO, false);
        timed(&mut reg, &log, "B", Duration::ZERO, false);
        let wait_log = Arc::clone(&log);
        reg.register(ActionFn::arc("Wait", move |ctx: ActionContext, _s: SessionRef, _a: Args| {
            let log = Arc::clone(&wait_log);
            async move {
                log.lock().unwrap().push("run:Wait".to_string());
                ctx.cancelled().await;
                let clean_log = Arc::clone(&log);
                let cleanup = Cleanup::new(move |_t| async move {
                    clean_log.lock().unwrap().push("clean:Wait".to_string());
                    Ok(())
                });
                Outcome::partial(cleanup, ActionError::Canceled)
            }
        }))
        .unwrap();
        let journey = Journey::from_json(
            r#"[{"action":"A","start":"0s"},{"action":"Wait","start":"+1ms"},{"action":"B","start":"+1ms"}]"#,
        )
        .unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            time::sleep(ms(50)).await;
            trigger.cancel();
        });

        let runner = Runner::new(reg);
        let mut rx = runner.bus().subscribe();
        let err = runner.run(&journey, &token, &session()).await.unwrap_err();

        assert!(err.error.is_cancelled());
        let at = err.error.position().unwrap();
        assert_eq!((&*at.action, at.index), ("Wait", 1));
        assert_eq!(at.since_start, ms(50));
        assert!(err.cleanup.is_empty());
        assert_eq!(entries(&log), ["run:A", "run:Wait", "clean:Wait", "clean:A"]);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(!kinds.contains(&EventKind::ActionFailed));
        assert_eq!(kinds.last(), Some(&EventKind::JourneyCancelled));
    }

    #[tokio::test]
    async fn test_cancelled_before_run_dispatches_nothing() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "A", Duration::ZERO, false);
        let journey = Journey::from_json(r#"[{"action":"A","start":"0s"}]"#).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = Runner::new(reg)
            .run(&journey, &token, &session())
            .await
            .unwrap_err();
        assert!(err.error.is_cancelled());
        assert_eq!(err.error.position().map(|p| p.index), Some(0));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let journey = Journey::from_json(r#"[{"action":"NoSuch"}]"#).unwrap();
        let err = Runner::new(Registry::with_builtins())
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap_err();
        match &err.error {
            JourneyError::UnknownAction { at } => {
                assert_eq!(at.index, 0);
                assert_eq!(&*at.action, "NoSuch");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.cleanup.is_empty());
    }

    #[tokio::test]
    async fn test_empty_journey() {
        let report = Runner::new(Registry::new())
            .run(&Journey::default(), &CancellationToken::new(), &session())
            .await
            .unwrap();
        assert!(report.dispatched.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_failure_on_successful_run() {
        let mut reg = Registry::new();
        reg.register_fn("Leaky", |_c: ActionContext, _s: SessionRef, _a: Args| async {
            Ok::<_, ActionError>(Cleanup::new(|_| async { Err(ActionError::failed("tab stuck")) }))
        })
        .unwrap();
        let journey = Journey::from_json(r#"[{"action":"Leaky","start":"0s"}]"#).unwrap();

        let err = Runner::new(reg)
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap_err();
        assert!(matches!(err.error, JourneyError::CleanupFailed { count: 1 }));
        assert_eq!(err.cleanup.len(), 1);
        assert_eq!(&*err.cleanup[0].action, "Leaky");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_names_dispatch_independently() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "Tap", Duration::ZERO, false);
        let journey = Journey::from_json(
            r#"[{"action":"Tap","start":"0s"},{"action":"Tap","start":"+0s"},{"action":"Tap","start":"20ms"}]"#,
        )
        .unwrap();
        let runner = Runner::new(reg);

        let first = runner
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap();
        let second = runner
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap();
        assert_eq!(first.order(), vec![0, 1, 2]);
        assert_eq!(first.order(), second.order());
        assert_eq!(entries(&log).iter().filter(|e| *e == "clean:Tap").count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_the_run() {
        let log = Log::default();
        let mut reg = Registry::new();
        timed(&mut reg, &log, "A", Duration::ZERO, false);
        let runner = Runner::new(reg);
        let mut rx = runner.bus().subscribe();
        let journey = Journey::from_json(r#"[{"action":"A","start":"0s"}]"#).unwrap();
        runner
            .run(&journey, &CancellationToken::new(), &session())
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::JourneyStarting,
                EventKind::ActionScheduled,
                EventKind::ActionStarting,
                EventKind::ActionCompleted,
                EventKind::JourneyFinished,
            ]
        );
    }
}
