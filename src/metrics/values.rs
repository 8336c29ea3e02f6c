//! # Performance values sink.
//!
//! [`PerfValues`] collects named measurements and writes them as
//! `perf_values.txt`, one metric per line:
//!
//! ```text
//! Journey.Duration, ms, smaller_is_better, 2163
//! Ash.Smoothness.average, percent, bigger_is_better, 87.5
//! Ash.Smoothness.jank_rate, percent, smaller_is_better, 12.5
//! ```
//!
//! The variant is appended to the name unless it is the default `summary`.
//! Multi-valued metrics print their samples space-separated.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Variant used when none is given.
pub const DEFAULT_VARIANT: &str = "summary";

/// Output file name written by [`PerfValues::save`].
pub const PERF_VALUES_FILE: &str = "perf_values.txt";

/// Which way is an improvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    SmallerIsBetter,
    BiggerIsBetter,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::SmallerIsBetter => "smaller_is_better",
            Direction::BiggerIsBetter => "bigger_is_better",
        }
    }
}

/// Key of one data series.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Metric {
    pub name: String,
    pub variant: String,
    pub unit: String,
    pub direction: Direction,
    /// Accepts [`PerfValues::append`].
    pub multiple: bool,
}

impl Metric {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            variant: DEFAULT_VARIANT.to_string(),
            unit: unit.into(),
            direction,
            multiple: false,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// `name` or `name.variant`.
    pub fn label(&self) -> String {
        if self.variant == DEFAULT_VARIANT || self.variant.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.variant)
        }
    }

    fn normalized(mut self) -> Result<Self, MetricsError> {
        if self.variant.is_empty() {
            self.variant = DEFAULT_VARIANT.to_string();
        }
        check_token(&self.name, 256, "name must be 1-256 of [a-zA-Z0-9._-]")?;
        check_token(&self.variant, 256, "variant must be 1-256 of [a-zA-Z0-9._-]")?;
        check_token(&self.unit, 32, "unit must be 1-32 of [a-zA-Z0-9._-]")?;
        Ok(self)
    }
}

fn check_token(s: &str, max: usize, reason: &'static str) -> Result<(), MetricsError> {
    let valid = !s.is_empty()
        && s.len() <= max
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(MetricsError::InvalidMetric {
            name: s.to_string(),
            reason,
        })
    }
}

/// Ordered collection of metric series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerfValues {
    values: BTreeMap<Metric, Vec<f64>>,
}

impl PerfValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the series of `metric` with a single value.
    pub fn set(&mut self, metric: Metric, value: f64) -> Result<(), MetricsError> {
        let metric = metric.normalized()?;
        self.values.insert(metric, vec![value]);
        Ok(())
    }

    /// Extends a multi-valued series.
    pub fn append(&mut self, metric: Metric, values: &[f64]) -> Result<(), MetricsError> {
        let metric = metric.normalized()?;
        if !metric.multiple {
            return Err(MetricsError::SingleValued { name: metric.name });
        }
        self.values.entry(metric).or_default().extend_from_slice(values);
        Ok(())
    }

    /// Moves every series of `other` into `self`.
    ///
    /// Multi-valued series are concatenated; a single-valued series already
    /// present is an error.
    pub fn merge(&mut self, other: PerfValues) -> Result<(), MetricsError> {
        for (metric, values) in other.values {
            if metric.multiple {
                self.values.entry(metric).or_default().extend(values);
            } else if self.values.contains_key(&metric) {
                return Err(MetricsError::SingleValued { name: metric.name });
            } else {
                self.values.insert(metric, values);
            }
        }
        Ok(())
    }

    pub fn get(&self, metric: &Metric) -> Option<&[f64]> {
        self.values.get(metric).map(Vec::as_slice)
    }

    /// Looks a series up by its printed label (`name` or `name.variant`).
    pub fn find(&self, label: &str) -> Option<&[f64]> {
        self.values
            .iter()
            .find(|(m, _)| m.label() == label)
            .map(|(_, v)| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders the `perf_values.txt` body.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (metric, values) in &self.values {
            let joined = values
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                out,
                "{}, {}, {}, {}",
                metric.label(),
                metric.unit,
                metric.direction.as_str(),
                joined
            );
        }
        out
    }

    /// Writes `perf_values.txt` into `dir`, creating the directory if needed.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf, MetricsError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(PERF_VALUES_FILE);
        tokio::fs::write(&path, self.render()).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duration_metric() -> Metric {
        Metric::new("Journey.Duration", "ms", Direction::SmallerIsBetter)
    }

    #[test]
    fn test_set_replaces_value() {
        let mut pv = PerfValues::new();
        pv.set(duration_metric(), 10.0).unwrap();
        pv.set(duration_metric(), 12.5).unwrap();
        assert_eq!(pv.get(&duration_metric()), Some(&[12.5][..]));
        assert_eq!(pv.len(), 1);
    }

    #[test]
    fn test_append_requires_multiple() {
        let mut pv = PerfValues::new();
        let err = pv.append(duration_metric(), &[1.0]).unwrap_err();
        assert_eq!(err.as_label(), "metrics_single_valued");

        let series = duration_metric().with_variant("per_action").multiple();
        pv.append(series.clone(), &[1.0, 2.0]).unwrap();
        pv.append(series.clone(), &[3.0]).unwrap();
        assert_eq!(pv.get(&series), Some(&[1.0, 2.0, 3.0][..]));
    }

    #[test]
    fn test_merge_rejects_duplicate_single_value() {
        let mut a = PerfValues::new();
        a.set(duration_metric(), 1.0).unwrap();
        let mut b = PerfValues::new();
        b.set(duration_metric(), 2.0).unwrap();
        assert!(a.merge(b).is_err());

        let series = duration_metric().multiple();
        let mut c = PerfValues::new();
        c.append(series.clone(), &[1.0]).unwrap();
        let mut d = PerfValues::new();
        d.append(series.clone(), &[2.0]).unwrap();
        c.merge(d).unwrap();
        assert_eq!(c.get(&series), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut pv = PerfValues::new();
        let bad = Metric::new("has space", "ms", Direction::SmallerIsBetter);
        assert_eq!(pv.set(bad, 1.0).unwrap_err().as_label(), "metrics_invalid_metric");
        let bad_unit = Metric::new("ok", "", Direction::SmallerIsBetter);
        assert!(pv.set(bad_unit, 1.0).is_err());
    }

    #[test]
    fn test_render_lines() {
        let mut pv = PerfValues::new();
        pv.set(duration_metric(), 2163.0).unwrap();
        pv.set(
            Metric::new("Ash.Smoothness", "percent", Direction::SmallerIsBetter).with_variant("jank_rate"),
            12.5,
        )
        .unwrap();
        let text = pv.render();
        assert!(text.contains("Journey.Duration, ms, smaller_is_better, 2163\n"), "{text}");
        assert!(text.contains("Ash.Smoothness.jank_rate, percent, smaller_is_better, 12.5\n"), "{text}");
        assert_eq!(pv.find("Ash.Smoothness.jank_rate"), Some(&[12.5][..]));
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut pv = PerfValues::new();
        pv.set(duration_metric(), 5.0).unwrap();
        let path = pv.save(dir.path().join("out")).await.unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text, "Journey.Duration, ms, smaller_is_better, 5\n");
    }
}
