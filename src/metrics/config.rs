//! Histogram recording configuration.

use crate::metrics::Direction;

/// Aggregate a histogram contributes to.
///
/// Every metric in a named group is also folded into one record named after
/// the group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricGroup {
    AnimationSmoothness,
    InputLatency,
    Other,
}

impl MetricGroup {
    /// Record name of the aggregate; `None` for [`MetricGroup::Other`].
    pub fn record_name(&self) -> Option<&'static str> {
        match self {
            MetricGroup::AnimationSmoothness => Some("AnimationSmoothness"),
            MetricGroup::InputLatency => Some("InputLatency"),
            MetricGroup::Other => None,
        }
    }
}

/// One histogram the recorder follows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricConfig {
    pub histogram: String,
    pub unit: String,
    pub direction: Direction,
    /// Thresholds for `jank_rate` and `very_jank_rate`.
    pub jank_criteria: [i64; 2],
    pub group: MetricGroup,
}

impl MetricConfig {
    /// Animation smoothness in percent; below 50 is jank, below 20 very jank.
    pub fn smoothness(histogram: impl Into<String>) -> Self {
        Self {
            histogram: histogram.into(),
            unit: "percent".into(),
            direction: Direction::BiggerIsBetter,
            jank_criteria: [50, 20],
            group: MetricGroup::AnimationSmoothness,
        }
    }

    /// Input latency in ms; above 100 is jank, above 250 very jank.
    pub fn latency(histogram: impl Into<String>) -> Self {
        Self {
            histogram: histogram.into(),
            unit: "ms".into(),
            direction: Direction::SmallerIsBetter,
            jank_criteria: [100, 250],
            group: MetricGroup::InputLatency,
        }
    }

    /// Reported as-is, not aggregated.
    pub fn custom(
        histogram: impl Into<String>,
        unit: impl Into<String>,
        direction: Direction,
        jank_criteria: [i64; 2],
    ) -> Self {
        Self {
            histogram: histogram.into(),
            unit: unit.into(),
            direction,
            jank_criteria,
            group: MetricGroup::Other,
        }
    }

    /// Parses `smoothness:<histogram>` or `latency:<histogram>`.
    pub fn parse(spec: &str) -> Option<Self> {
        let (kind, name) = spec.split_once(':')?;
        if name.is_empty() {
            return None;
        }
        match kind {
            "smoothness" => Some(Self::smoothness(name)),
            "latency" => Some(Self::latency(name)),
            _ => None,
        }
    }

    pub(crate) fn aggregate(group: MetricGroup) -> Option<Self> {
        let (unit, direction) = match group {
            MetricGroup::AnimationSmoothness => ("percent", Direction::BiggerIsBetter),
            MetricGroup::InputLatency => ("ms", Direction::SmallerIsBetter),
            MetricGroup::Other => return None,
        };
        Some(Self::custom(group.record_name()?, unit, direction, [0, 0]))
    }
}
