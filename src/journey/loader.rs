//! # Journey loader: descriptors to a task chain.
//!
//! Turns the ordered descriptor list into [`Task`]s:
//!
//! ```text
//! for each descriptor (input order):
//!   start = StartSpec::parse(desc.start)        (empty → +1ms)
//!   ├─ Absolute(at)            → independent, st = at
//!   ├─ Relative(rt), no prior  → independent, st = rt (promoted)
//!   └─ Relative(rt), prior P   → dependent on P, P.blocked = this
//!                                st finalized when P completes
//! ```
//!
//! ## Rules
//! - A dependent task's predecessor is always the immediately preceding descriptor.
//! - Each task unblocks at most one follower, so the dependency graph is a set of chains.
//! - The loader never inspects `args`; unknown action names are detected at dispatch.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::JourneyError;
use crate::journey::{ActionDescriptor, Args, StartSpec};

/// Scheduler view of one descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// Zero-based descriptor index.
    pub index: usize,
    /// Registry key.
    pub action: Arc<str>,
    /// Payload handed to the handler untouched.
    pub args: Args,
    /// Parsed start specifier.
    pub start: StartSpec,
    /// Absolute fire time from journey start. Provisional for dependent tasks.
    pub st: Duration,
    /// Offset added to the predecessor's completion time (dependent tasks).
    pub rt: Duration,
    /// Index of the task waiting for this one to complete.
    pub blocked: Option<usize>,
    /// Index of the task this one waits for.
    pub after: Option<usize>,
}

impl Task {
    pub fn is_dependent(&self) -> bool {
        self.after.is_some()
    }
}

/// A loaded journey: tasks in input order with their dependency links.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Journey {
    tasks: Vec<Task>,
}

impl Journey {
    /// Parses a journey JSON document.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use cuj_runner::Journey;
    ///
    /// let journey = Journey::from_json(r#"[
    ///     {"action":"OpenUrl","args":{"url":"https://example.test/"},"start":"0s"},
    ///     {"action":"ClickUI","args":{"role":"button","name":"Go"},"start":"+250ms"},
    ///     {"action":"LockScreen","start":"+2s"}
    /// ]"#).unwrap();
    ///
    /// assert_eq!(journey.len(), 3);
    /// assert_eq!(journey.tasks()[0].blocked, Some(1));
    /// assert_eq!(journey.tasks()[2].rt, Duration::from_secs(2));
    /// ```
    pub fn from_json(text: &str) -> Result<Self, JourneyError> {
        let descriptors: Vec<ActionDescriptor> =
            serde_json::from_str(text).map_err(|e| JourneyError::BadJourney {
                reason: e.to_string(),
            })?;
        Self::from_descriptors(descriptors)
    }

    /// Reads and parses a journey file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, JourneyError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| JourneyError::BadJourney {
                reason: format!("{}: {e}", path.display()),
            })?;
        Self::from_json(&text)
    }

    /// Builds the task chain from descriptors, preserving their order.
    pub fn from_descriptors(descriptors: Vec<ActionDescriptor>) -> Result<Self, JourneyError> {
        let mut tasks: Vec<Task> = Vec::with_capacity(descriptors.len());

        for (index, desc) in descriptors.into_iter().enumerate() {
            let raw = desc.start.as_deref().unwrap_or("");
            let start = StartSpec::parse(raw).map_err(|e| JourneyError::BadSchedule {
                index,
                action: desc.action.clone(),
                start: raw.to_string(),
                reason: e.to_string(),
            })?;

            let mut task = Task {
                index,
                action: desc.action.into(),
                args: Args::from(desc.args),
                start,
                st: Duration::ZERO,
                rt: Duration::ZERO,
                blocked: None,
                after: None,
            };

            match start {
                StartSpec::Absolute(at) => task.st = at,
                StartSpec::Relative(offset) => {
                    task.rt = offset;
                    match tasks.last_mut() {
                        Some(last) => {
                            last.blocked = Some(index);
                            task.after = Some(last.index);
                        }
                        None => task.st = offset,
                    }
                }
            }
            tasks.push(task);
        }

        Ok(Self { tasks })
    }

    /// Converts back to wire descriptors.
    ///
    /// Reloading the output yields an equal journey.
    pub fn to_descriptors(&self) -> Vec<ActionDescriptor> {
        self.tasks
            .iter()
            .map(|task| ActionDescriptor {
                action: task.action.to_string(),
                args: task.args.clone().into_raw(),
                start: Some(task.start.to_string()),
            })
            .collect()
    }

    /// Serializes back to the journey JSON format.
    pub fn to_json(&self) -> String {
        // Descriptors hold only strings and validated raw JSON.
        serde_json::to_string(&self.to_descriptors()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Independent tasks in dispatch order: ascending `st`, ties by index.
    pub fn initial_order(&self) -> Vec<usize> {
        let mut ready: Vec<&Task> = self.tasks.iter().filter(|t| !t.is_dependent()).collect();
        ready.sort_by_key(|t| t.st);
        ready.into_iter().map(|t| t.index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_absolute_tasks_sort_by_start() {
        let j = Journey::from_json(
            r#"[{"action":"A","start":"0s"},{"action":"B","start":"100ms"},{"action":"C","start":"50ms"}]"#,
        )
        .unwrap();
        assert_eq!(j.initial_order(), vec![0, 2, 1]);
        assert!(j.tasks().iter().all(|t| !t.is_dependent()));
    }

    #[test]
    fn test_relative_tasks_chain_to_predecessor() {
        let j = Journey::from_json(
            r#"[{"action":"A","start":"0s"},{"action":"B","start":"+10ms"},{"action":"C","start":"+5ms"}]"#,
        )
        .unwrap();
        let t = j.tasks();
        assert_eq!(t[0].blocked, Some(1));
        assert_eq!(t[1].after, Some(0));
        assert_eq!(t[1].blocked, Some(2));
        assert_eq!(t[2].after, Some(1));
        assert_eq!(t[1].rt, ms(10));
        assert_eq!(t[2].rt, ms(5));
        assert_eq!(j.initial_order(), vec![0]);
    }

    #[test]
    fn test_first_empty_start_is_promoted() {
        let j = Journey::from_json(r#"[{"action":"A"},{"action":"B","start":""}]"#).unwrap();
        let t = j.tasks();
        assert!(!t[0].is_dependent());
        assert_eq!(t[0].st, ms(1));
        assert_eq!(t[1].after, Some(0));
        assert_eq!(t[1].rt, ms(1));
    }

    #[test]
    fn test_absolute_after_relative_is_independent() {
        let j = Journey::from_json(
            r#"[{"action":"A","start":"0s"},{"action":"B","start":"+1s"},{"action":"C","start":"20ms"}]"#,
        )
        .unwrap();
        assert_eq!(j.initial_order(), vec![0, 2]);
        assert_eq!(j.tasks()[1].blocked, None);
    }

    #[test]
    fn test_plus_zero_depends_on_predecessor() {
        let j = Journey::from_json(r#"[{"action":"A","start":"0s"},{"action":"B","start":"+0s"}]"#).unwrap();
        assert_eq!(j.tasks()[1].after, Some(0));
        assert_eq!(j.tasks()[1].rt, Duration::ZERO);
    }

    #[test]
    fn test_bad_schedule_names_descriptor() {
        let err = Journey::from_json(r#"[{"action":"A","start":"0s"},{"action":"B","start":"soon"}]"#)
            .unwrap_err();
        match err {
            JourneyError::BadSchedule { index, action, start, .. } => {
                assert_eq!(index, 1);
                assert_eq!(action, "B");
                assert_eq!(start, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_journey_on_malformed_json() {
        for text in [r#"{"action":"A"}"#, "[", r#"[{"start":"0s"}]"#, r#"[{"action":1}]"#] {
            let err = Journey::from_json(text).unwrap_err();
            assert_eq!(err.as_label(), "journey_bad_journey", "{text}");
        }
    }

    #[test]
    fn test_empty_journey_is_valid() {
        let j = Journey::from_json("[]").unwrap();
        assert!(j.is_empty());
        assert!(j.initial_order().is_empty());
    }

    #[test]
    fn test_args_are_not_inspected() {
        let j = Journey::from_json(r#"[{"action":"NoSuch","args":[1,"two",{"three":3}]}]"#).unwrap();
        assert_eq!(j.tasks()[0].args.raw(), Some(r#"[1,"two",{"three":3}]"#));
    }

    #[test]
    fn test_round_trip_yields_equal_journey() {
        let text = r#"[
            {"action":"OpenUrl","args":{"url":"https://example.test/"},"start":"0s"},
            {"action":"ClickUI","args":{"role":"button","name":"Go"},"start":"+250ms"},
            {"action":"LockScreen","start":"+2s"},
            {"action":"ClickUI","args":{"name":"Go"},"start":"1.5s"},
            {"action":"UnlockScreen"}
        ]"#;
        let first = Journey::from_json(text).unwrap();
        let second = Journey::from_json(&first.to_json()).unwrap();
        assert_eq!(first, second);

        let promoted = Journey::from_json(r#"[{"action":"A"}]"#).unwrap();
        assert_eq!(Journey::from_json(&promoted.to_json()).unwrap(), promoted);
    }

    #[test]
    fn test_from_descriptors_matches_json() {
        let built = Journey::from_descriptors(vec![
            ActionDescriptor::new("OpenUrl")
                .with_start("0s")
                .with_args(r#"{"url":"https://example.test/"}"#)
                .unwrap(),
            ActionDescriptor::new("LockScreen").with_start("+2s"),
            ActionDescriptor::new("UnlockScreen"),
        ])
        .unwrap();
        let parsed = Journey::from_json(
            r#"[{"action":"OpenUrl","args":{"url":"https://example.test/"},"start":"0s"},
                {"action":"LockScreen","start":"+2s"},
                {"action":"UnlockScreen"}]"#,
        )
        .unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.tasks()[2].rt, ms(1));
        assert!(ActionDescriptor::new("X").with_args("{not json").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_bad_journey() {
        let err = Journey::load("/definitely/not/here.json").await.unwrap_err();
        assert!(err.is_load_error());
    }
}
