//! # Histogram snapshots and jank estimation.
//!
//! A [`Histogram`] is a cumulative snapshot as reported by the session backend.
//! The recorder takes one at start and one at stop; [`Histogram::diff`] yields
//! the samples produced in between.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::metrics::Direction;

/// Samples in `[min, max)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub min: i64,
    pub max: i64,
    pub count: i64,
}

impl Bucket {
    pub fn new(min: i64, max: i64, count: i64) -> Self {
        Self { min, max, count }
    }
}

/// Named histogram snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub name: String,
    /// Sum of every sample.
    #[serde(default)]
    pub sum: i64,
    /// Non-empty buckets in ascending order.
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

impl Histogram {
    /// An empty histogram.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sum: 0,
            buckets: Vec::new(),
        }
    }

    pub fn total_count(&self) -> i64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Samples recorded since `earlier`.
    ///
    /// Fails if `earlier` has a different name or holds samples this snapshot
    /// no longer has.
    ///
    /// # Example
    /// ```
    /// use cuj_runner::metrics::{Bucket, Histogram};
    ///
    /// let before = Histogram { name: "h".into(), sum: 10, buckets: vec![Bucket::new(0, 10, 2)] };
    /// let after = Histogram {
    ///     name: "h".into(),
    ///     sum: 45,
    ///     buckets: vec![Bucket::new(0, 10, 3), Bucket::new(10, 20, 2)],
    /// };
    /// let diff = after.diff(&before).unwrap();
    /// assert_eq!(diff.sum, 35);
    /// assert_eq!(diff.total_count(), 3);
    /// ```
    pub fn diff(&self, earlier: &Histogram) -> Result<Histogram, MetricsError> {
        if self.name != earlier.name {
            return Err(MetricsError::InvalidMetric {
                name: earlier.name.clone(),
                reason: "histogram name mismatch",
            });
        }
        let shrunk = || MetricsError::Shrunk {
            name: self.name.clone(),
        };

        let mut before: HashMap<(i64, i64), i64> = earlier
            .buckets
            .iter()
            .map(|b| ((b.min, b.max), b.count))
            .collect();

        let mut buckets = Vec::with_capacity(self.buckets.len());
        for b in &self.buckets {
            let count = b.count - before.remove(&(b.min, b.max)).unwrap_or(0);
            if count < 0 {
                return Err(shrunk());
            }
            if count > 0 {
                buckets.push(Bucket::new(b.min, b.max, count));
            }
        }
        if before.values().any(|&c| c > 0) {
            return Err(shrunk());
        }

        Ok(Histogram {
            name: self.name.clone(),
            sum: self.sum - earlier.sum,
            buckets,
        })
    }

    /// Estimated number of samples on the wrong side of `criteria`.
    ///
    /// Samples in a bucket straddling `criteria` are assumed uniformly
    /// distributed across it.
    pub fn jank_count(&self, direction: Direction, criteria: i64) -> f64 {
        let mut count = 0.0;
        for b in &self.buckets {
            let width = (b.max - b.min) as f64;
            match direction {
                Direction::BiggerIsBetter => {
                    if b.max < criteria {
                        count += b.count as f64;
                    } else if b.min <= criteria && width > 0.0 {
                        count += b.count as f64 * (criteria - b.min) as f64 / width;
                    }
                }
                Direction::SmallerIsBetter => {
                    if b.min > criteria {
                        count += b.count as f64;
                    } else if b.max > criteria && width > 0.0 {
                        count += b.count as f64 * (b.max - criteria) as f64 / width;
                    }
                }
            }
        }
        count
    }
}
