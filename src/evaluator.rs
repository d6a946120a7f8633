//! Condition evaluator.
//!
//! Compares one [`SensorReading`] against the configured
//! [`ThresholdFilter`]s and returns the violated subset.  Runs once per
//! reading per consumer, before any debounce or dispatch decision.
//!
//! ## Rules
//!
//! - Only filters naming the reading's metric are considered.
//! - `Upper` is violated when `value > threshold`, `Lower` when
//!   `value < threshold`.  A reading exactly on the threshold never
//!   violates.
//! - Filters are independent: an upper and a lower filter on the same
//!   metric (or two filters with the same identity) are each checked, so
//!   one reading yields zero, one or several violations.
//!
//! Unknown metric names never reach this module; they are rejected when
//! the configuration is validated.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sensors::{Metric, SensorReading};

/// Whether a threshold is a ceiling or a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundDirection {
    Upper,
    Lower,
}

impl BoundDirection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
        }
    }

    /// Strict comparison: equality is never a breach.
    pub fn breached(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Upper => value > threshold,
            Self::Lower => value < threshold,
        }
    }
}

impl fmt::Display for BoundDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a configuration string is neither `upper` nor `lower`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl FromStr for BoundDirection {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upper" => Ok(Self::Upper),
            "lower" => Ok(Self::Lower),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

/// One validated threshold rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFilter {
    pub metric: Metric,
    pub direction: BoundDirection,
    pub threshold: f64,
}

impl ThresholdFilter {
    pub const fn new(metric: Metric, direction: BoundDirection, threshold: f64) -> Self {
        Self {
            metric,
            direction,
            threshold,
        }
    }

    /// True if `reading` is strictly beyond this filter's threshold.
    pub fn is_violated_by(&self, reading: &SensorReading) -> bool {
        reading.metric == self.metric && self.direction.breached(reading.value, self.threshold)
    }
}

/// A reading that breached a filter.  Lives for one tick only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationEvent {
    pub filter: ThresholdFilter,
    pub reading: SensorReading,
    /// Distance past the threshold (always positive).
    pub magnitude: f64,
}

/// Return every filter in `filters` that `reading` violates, in filter order.
pub fn evaluate(reading: &SensorReading, filters: &[ThresholdFilter]) -> Vec<ViolationEvent> {
    filters
        .iter()
        .filter(|f| f.is_violated_by(reading))
        .map(|f| ViolationEvent {
            filter: *f,
            reading: *reading,
            magnitude: (reading.value - f.threshold).abs(),
        })
        .collect()
}

/// Evaluate a whole tick's readings.
pub fn evaluate_all(readings: &[SensorReading], filters: &[ThresholdFilter]) -> Vec<ViolationEvent> {
    readings
        .iter()
        .flat_map(|r| evaluate(r, filters))
        .collect()
}
