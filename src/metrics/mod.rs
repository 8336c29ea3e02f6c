//! Performance metrics: histogram recording and the `perf_values.txt` sink.
//!
//! ## Contents
//! - [`Histogram`], [`Bucket`] cumulative snapshots and their difference
//! - [`MetricConfig`], [`MetricGroup`] what the recorder follows
//! - [`Recorder`], [`HistogramSource`] start/stop bracketing of a scenario
//! - [`PerfValues`], [`Metric`], [`Direction`] named series written to disk

mod config;
mod histogram;
mod recorder;
mod values;

pub use config::{MetricConfig, MetricGroup};
pub use histogram::{Bucket, Histogram};
pub use recorder::{HISTOGRAMS_FILE, HistogramSource, Record, Recorder, RecorderError, SessionHistograms};
pub use values::{DEFAULT_VARIANT, Direction, Metric, PERF_VALUES_FILE, PerfValues};
