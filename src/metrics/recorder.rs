//! # Histogram recorder.
//!
//! [`Recorder`] brackets a scenario with two histogram snapshots and keeps
//! the per-histogram difference, accumulated across repeated runs.
//!
//! ```text
//! start ──► snapshot₀          stop ──► snapshot₁
//!                 └────── diff ──────────┘
//!                           │
//!                           ▼
//!     Record { sum, buckets, total_count, jank_counts[2] }
//!                           │ (smoothness / latency only)
//!                           ▼
//!             group aggregate (AnimationSmoothness / InputLatency)
//! ```
//!
//! [`Recorder::record`] turns every non-empty record into three perf values:
//! `<name>.average`, `<name>.jank_rate` and `<name>.very_jank_rate`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{MetricsError, SessionError};
use crate::metrics::{Bucket, Direction, Histogram, Metric, MetricConfig, MetricGroup, PerfValues};
use crate::session::SessionRef;

/// File name written by [`Recorder::save_histograms`].
pub const HISTOGRAMS_FILE: &str = "recorder_histograms.json";

/// Where cumulative histogram snapshots come from.
#[async_trait]
pub trait HistogramSource: Send + Sync + 'static {
    async fn snapshot(&self, names: &[String]) -> Result<Vec<Histogram>, SessionError>;
}

/// Reads histograms through a [`Session`](crate::session::Session).
#[derive(Clone)]
pub struct SessionHistograms(pub SessionRef);

#[async_trait]
impl HistogramSource for SessionHistograms {
    async fn snapshot(&self, names: &[String]) -> Result<Vec<Histogram>, SessionError> {
        self.0.histograms(names).await
    }
}

/// Accumulated samples of one histogram or group.
#[derive(Debug, Serialize)]
pub struct Record {
    #[serde(skip)]
    config: MetricConfig,
    pub sum: i64,
    pub buckets: Vec<Bucket>,
    #[serde(skip)]
    total_count: i64,
    #[serde(skip)]
    jank_counts: [f64; 2],
}

impl Record {
    fn new(config: MetricConfig) -> Self {
        Self {
            config,
            sum: 0,
            buckets: Vec::new(),
            total_count: 0,
            jank_counts: [0.0; 2],
        }
    }

    fn absorb(&mut self, count: i64, sum: i64, janks: [f64; 2]) {
        self.total_count += count;
        self.sum += sum;
        self.jank_counts[0] += janks[0];
        self.jank_counts[1] += janks[1];
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    pub fn total_count(&self) -> i64 {
        self.total_count
    }

    /// Estimated samples past the first and second jank criteria.
    pub fn jank_counts(&self) -> [f64; 2] {
        self.jank_counts
    }

    /// Mean sample, `None` when nothing was recorded.
    pub fn average(&self) -> Option<f64> {
        (self.total_count > 0).then(|| self.sum as f64 / self.total_count as f64)
    }
}

/// Failure of [`Recorder::run`]: either the scenario or the recording.
#[derive(Debug)]
pub enum RecorderError<E> {
    Run(E),
    Metrics(MetricsError),
}

impl<E: fmt::Display> fmt::Display for RecorderError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderError::Run(e) => e.fmt(f),
            RecorderError::Metrics(e) => e.fmt(f),
        }
    }
}

impl<E> std::error::Error for RecorderError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecorderError::Run(e) => Some(e),
            RecorderError::Metrics(e) => Some(e),
        }
    }
}

struct Baseline {
    started: Instant,
    snapshot: HashMap<String, Histogram>,
}

/// Histogram recorder.
pub struct Recorder {
    source: Arc<dyn HistogramSource>,
    names: Vec<String>,
    records: BTreeMap<String, Record>,
    baseline: Option<Baseline>,
    duration: Duration,
}

impl Recorder {
    /// Creates a recorder following every histogram in `configs`.
    ///
    /// Fails on duplicate histograms and on histograms named like a group
    /// aggregate.
    pub fn new(
        source: Arc<dyn HistogramSource>,
        configs: impl IntoIterator<Item = MetricConfig>,
    ) -> Result<Self, MetricsError> {
        let mut names = Vec::new();
        let mut records = BTreeMap::new();
        let mut aggregates = Vec::new();

        for config in configs {
            let name = config.histogram.clone();
            if is_group_name(&name) {
                return Err(MetricsError::InvalidMetric {
                    name,
                    reason: "histogram name is reserved for a group aggregate",
                });
            }
            if records.contains_key(&name) {
                return Err(MetricsError::InvalidMetric {
                    name,
                    reason: "histogram configured twice",
                });
            }
            if !aggregates.contains(&config.group) {
                aggregates.push(config.group);
            }
            names.push(name.clone());
            records.insert(name, Record::new(config));
        }
        for group in aggregates {
            if let Some(config) = MetricConfig::aggregate(group) {
                records.insert(config.histogram.clone(), Record::new(config));
            }
        }

        Ok(Self {
            source,
            names,
            records,
            baseline: None,
            duration: Duration::ZERO,
        })
    }

    /// Shortcut for a recorder reading from `session`.
    pub fn for_session(
        session: SessionRef,
        configs: impl IntoIterator<Item = MetricConfig>,
    ) -> Result<Self, MetricsError> {
        Self::new(Arc::new(SessionHistograms(session)), configs)
    }

    /// Total time spent between `start` and `stop` so far.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_recording(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn record_for(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    /// Takes the baseline snapshot.
    pub async fn start(&mut self, token: &CancellationToken) -> Result<(), MetricsError> {
        if self.baseline.is_some() {
            return Err(MetricsError::AlreadyStarted);
        }
        let snapshot = self.snapshot(token).await?;
        self.baseline = Some(Baseline {
            started: Instant::now(),
            snapshot: snapshot.into_iter().map(|h| (h.name.clone(), h)).collect(),
        });
        debug!(histograms = self.names.len(), "recording started");
        Ok(())
    }

    /// Takes the closing snapshot and folds the difference into the records.
    pub async fn stop(&mut self, token: &CancellationToken) -> Result<(), MetricsError> {
        let Some(baseline) = self.baseline.take() else {
            return Err(MetricsError::NotStarted);
        };
        self.duration += baseline.started.elapsed();

        let now = self.snapshot(token).await?;
        for hist in now {
            let diff = match baseline.snapshot.get(&hist.name) {
                Some(earlier) => hist.diff(earlier)?,
                None => hist,
            };
            let count = diff.total_count();
            if count == 0 {
                continue;
            }
            let Some(record) = self.records.get_mut(&diff.name) else {
                continue;
            };

            let [jank, very_jank] = record.config.jank_criteria;
            let janks = [
                diff.jank_count(record.config.direction, jank),
                diff.jank_count(record.config.direction, very_jank),
            ];
            record.absorb(count, diff.sum, janks);
            record.buckets.extend_from_slice(&diff.buckets);

            let group = record.config.group;
            if let Some(total) = group.record_name().and_then(|n| self.records.get_mut(n)) {
                total.absorb(count, diff.sum, janks);
            }
        }
        debug!(duration = ?self.duration, "recording stopped");
        Ok(())
    }

    /// Runs `f` between `start` and `stop`.
    ///
    /// An error from `f` wins over an error from `stop`; the latter is only
    /// logged then.
    pub async fn run<F, Fut, T, E>(
        &mut self,
        token: &CancellationToken,
        f: F,
    ) -> Result<T, RecorderError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.start(token).await.map_err(RecorderError::Metrics)?;
        let res = f(token.clone()).await;
        let stopped = self.stop(token).await;

        match (res, stopped) {
            (Ok(v), Ok(())) => Ok(v),
            (Ok(_), Err(e)) => Err(RecorderError::Metrics(e)),
            (Err(e), stopped) => {
                if let Err(stop_err) = stopped {
                    warn!(error = %stop_err, "failed to stop recording");
                }
                Err(RecorderError::Run(e))
            }
        }
    }

    /// Repeats [`Recorder::run`] until the recorded duration reaches `min`.
    pub async fn run_until<F, Fut, E>(
        &mut self,
        token: &CancellationToken,
        mut f: F,
        min: Duration,
    ) -> Result<(), RecorderError<E>>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        while self.duration < min {
            self.run(token, &mut f).await?;
        }
        Ok(())
    }

    /// Writes `average`, `jank_rate` and `very_jank_rate` of every non-empty record.
    pub fn record(&self, pv: &mut PerfValues) -> Result<(), MetricsError> {
        for (name, record) in &self.records {
            let Some(average) = record.average() else {
                continue;
            };
            let total = record.total_count as f64;
            pv.set(
                Metric::new(name.as_str(), record.config.unit.as_str(), record.config.direction)
                    .with_variant("average"),
                average,
            )?;
            pv.set(
                Metric::new(name.as_str(), "percent", Direction::SmallerIsBetter).with_variant("jank_rate"),
                record.jank_counts[0] / total * 100.0,
            )?;
            pv.set(
                Metric::new(name.as_str(), "percent", Direction::SmallerIsBetter)
                    .with_variant("very_jank_rate"),
                record.jank_counts[1] / total * 100.0,
            )?;
        }
        Ok(())
    }

    /// Dumps the raw records as pretty JSON into `dir`.
    pub async fn save_histograms(&self, dir: impl AsRef<Path>) -> Result<PathBuf, MetricsError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(HISTOGRAMS_FILE);
        let body = serde_json::to_vec_pretty(&self.records)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }

    async fn snapshot(&self, token: &CancellationToken) -> Result<Vec<Histogram>, MetricsError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(MetricsError::Cancelled),
            res = self.source.snapshot(&self.names) => Ok(res?),
        }
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("histograms", &self.names)
            .field("recording", &self.is_recording())
            .field("duration", &self.duration)
            .finish()
    }
}

fn is_group_name(name: &str) -> bool {
    [MetricGroup::AnimationSmoothness, MetricGroup::InputLatency]
        .iter()
        .any(|g| g.record_name() == Some(name))
}
