//! Sensor subsystem: metric kinds, readings and the aggregating [`SensorHub`].
//!
//! The hub owns one [`SensorPort`] channel per metric and produces a list of
//! [`SensorReading`]s each tick.  Which physical sensor model serves which
//! metric is resolved once at startup by [`SensorModel::resolve_channels`].

pub mod sim;

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDateTime;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::SensorPort;
use crate::error::SensorError;

// ═══════════════════════════════════════════════════════════════
//  Metric kinds
// ═══════════════════════════════════════════════════════════════

/// The closed set of measurable quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Light,
    Temperature,
    Humidity,
    Co2,
    Distance,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Light,
        Metric::Temperature,
        Metric::Humidity,
        Metric::Co2,
        Metric::Distance,
    ];

    /// Configuration / log name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Co2 => "co2",
            Self::Distance => "distance",
        }
    }

    /// Unit the readings for this metric are expressed in.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Light => "lux",
            Self::Temperature => "C",
            Self::Humidity => "%",
            Self::Co2 => "ppm",
            Self::Distance => "mm",
        }
    }

    /// Name with the first letter upper-cased (`"Co2"`, `"Light"`).
    pub fn display_name(self) -> String {
        let name = self.name();
        let mut out = String::with_capacity(name.len());
        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
        out
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a configuration string names no known metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Readings
// ═══════════════════════════════════════════════════════════════

/// One immutable measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub metric: Metric,
    pub value: f64,
    pub unit: &'static str,
    pub timestamp: NaiveDateTime,
}

impl SensorReading {
    pub fn new(metric: Metric, value: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            metric,
            value,
            unit: metric.unit(),
            timestamp,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Sensor models
// ═══════════════════════════════════════════════════════════════

/// Supported sensor boards, in metric-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorModel {
    /// BH1750FVI ambient light sensor (I2C).
    Bh1750fvi,
    /// SHT31 temperature / humidity sensor (I2C).
    Sht31,
    /// CO2-mini USB HID monitor.
    Co2mini,
    /// VL6180X time-of-flight ranging + ambient light (I2C).
    Vl6180,
}

impl SensorModel {
    pub const PRIORITY: [SensorModel; 4] = [
        SensorModel::Bh1750fvi,
        SensorModel::Sht31,
        SensorModel::Co2mini,
        SensorModel::Vl6180,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bh1750fvi => "bh1750fvi",
            Self::Sht31 => "sht31",
            Self::Co2mini => "co2mini",
            Self::Vl6180 => "vl6180",
        }
    }

    /// Metrics this model can report.
    pub const fn metrics(self) -> &'static [Metric] {
        match self {
            Self::Bh1750fvi => &[Metric::Light],
            Self::Sht31 => &[Metric::Temperature, Metric::Humidity],
            Self::Co2mini => &[Metric::Temperature, Metric::Humidity, Metric::Co2],
            Self::Vl6180 => &[Metric::Light, Metric::Distance],
        }
    }

    /// Pick the serving model for every metric from the enabled set.
    ///
    /// The model listed earlier in [`SensorModel::PRIORITY`] wins when two
    /// enabled models report the same metric.
    pub fn resolve_channels(enabled: &[SensorModel]) -> Vec<(Metric, SensorModel)> {
        let mut channels: Vec<(Metric, SensorModel)> = Vec::new();
        for model in Self::PRIORITY {
            if !enabled.contains(&model) {
                continue;
            }
            for &metric in model.metrics() {
                if !channels.iter().any(|(m, _)| *m == metric) {
                    channels.push((metric, model));
                }
            }
        }
        channels
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Hub
// ═══════════════════════════════════════════════════════════════

/// A failed read, kept so the tick can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFailure {
    pub metric: Metric,
    pub error: SensorError,
}

/// Aggregates one sensor channel per metric.
pub struct SensorHub {
    channels: Vec<Box<dyn SensorPort + Send>>,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHub {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Register a channel.  A second channel for an already served metric
    /// is ignored with a warning.
    pub fn attach(&mut self, channel: Box<dyn SensorPort + Send>) {
        let metric = channel.metric();
        if self.serves(metric) {
            warn!("SensorHub: {} already served, ignoring extra channel", metric);
            return;
        }
        self.channels.push(channel);
    }

    /// Whether some channel reports `metric`.
    pub fn serves(&self, metric: Metric) -> bool {
        self.channels.iter().any(|c| c.metric() == metric)
    }

    /// Metrics in registration order.
    pub fn metrics(&self) -> Vec<Metric> {
        self.channels.iter().map(|c| c.metric()).collect()
    }

    /// Read every channel once.
    ///
    /// A failed read never aborts the others: it is logged and returned in
    /// the failure list, and that metric simply has no reading this tick.
    pub fn read_all(&mut self, now: NaiveDateTime) -> (Vec<SensorReading>, Vec<ReadFailure>) {
        let mut readings = Vec::with_capacity(self.channels.len());
        let mut failures = Vec::new();
        for channel in &mut self.channels {
            let metric = channel.metric();
            match channel.read(now) {
                Ok(reading) => readings.push(reading),
                Err(error) => {
                    warn!("SensorHub: {} read failed: {}", metric, error);
                    failures.push(ReadFailure { metric, error });
                }
            }
        }
        (readings, failures)
    }
}
