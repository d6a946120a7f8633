//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ MonitorService (domain)
//! ```
//!
//! Driven adapters (sensors, mail, relay, camera, event sinks, clock,
//! configuration) implement these traits.  The
//! [`MonitorService`](super::service::MonitorService) consumes them via
//! generics, so the domain core never performs network or hardware I/O
//! itself.
//!
//! All port errors are typed; callers handle every variant explicitly.

use core::fmt;

use chrono::NaiveDateTime;

use crate::config::MonitorConfig;
use crate::error::{ActionError, SensorError};
use crate::evaluator::BoundDirection;
use crate::sensors::{Metric, SensorReading};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One measurement channel.  A physical board reporting several metrics
/// is exposed as several channels.
pub trait SensorPort {
    /// The metric this channel reports.
    fn metric(&self) -> Metric;

    /// Take one reading, stamped with `now`.
    fn read(&mut self, now: NaiveDateTime) -> Result<SensorReading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Action ports (driven adapters: domain → outside world)
// ───────────────────────────────────────────────────────────────

/// Everything a mail alert needs to describe one violation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub metric: Metric,
    pub direction: BoundDirection,
    pub threshold: f64,
    pub value: f64,
    pub unit: &'static str,
}

/// Outbound mail (alerts and periodic summaries).
pub trait MailPort {
    fn send_alert(&mut self, alert: &AlertMessage) -> Result<(), ActionError>;

    /// Send the summary covering the last `period_days` days.
    fn send_summary(&mut self, period_days: u32) -> Result<(), ActionError>;
}

/// Mains relay switching a load (fan, humidifier, lamp…).
pub trait RelayPort {
    /// Switch on for `duration_minutes`.  Must not block for the duration.
    fn activate(&mut self, duration_minutes: u32, now: NaiveDateTime) -> Result<(), ActionError>;

    /// Switch off if the on-duration has elapsed.  Called frequently by
    /// the run loop.
    fn service(&mut self, _now: NaiveDateTime) {}

    /// Switch off immediately.
    fn deactivate(&mut self) -> Result<(), ActionError>;

    /// Release the output (switch off and leave the line floating/safe).
    fn cleanup(&mut self) {}
}

/// Opaque capture settings forwarded to the camera.
pub type CameraSettings = serde_json::Map<String, serde_json::Value>;

pub trait CameraPort {
    fn capture(&mut self, settings: &CameraSettings, now: NaiveDateTime) -> Result<(), ActionError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log, spreadsheet…).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time.
pub trait TimePort {
    fn now(&self) -> NaiveDateTime;

    /// Block the calling thread for `period`.  Fake clocks advance instead.
    fn pause(&self, period: core::time::Duration) {
        std::thread::sleep(period);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads and validates configuration.
///
/// Implementations reject invalid documents with a [`ConfigError`]; they
/// never drop an unparseable rule silently.
pub trait ConfigPort {
    fn load(&self) -> Result<MonitorConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from actions)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes when a
/// job is due.  An error leaves the occurrence unfired.
pub trait SchedulerDelegate {
    fn on_schedule_fired(&mut self, label: &str, job: ScheduledJob) -> Result<(), ActionError>;

    /// Told about a job that returned an error; it stays due for retry.
    fn on_schedule_failed(&mut self, _label: &str, _job: ScheduledJob, _error: &ActionError) {}
}

/// Jobs that run on a weekly schedule rather than on a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    /// Mail a summary of the last days.
    SummaryMail,
    /// Switch the relay on for its configured duration.
    RelayActivation,
    /// Take a camera picture.
    CameraCapture,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.  All are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The document could not be read or deserialized.
    Unreadable(String),
    /// A filter names a metric outside the known set.
    UnknownMetric(String),
    /// A filter `limit` is neither `upper` nor `lower`.
    UnknownLimit(String),
    /// A filter threshold is NaN or infinite.
    InvalidThreshold { metric: Metric, section: &'static str },
    /// `at_time` entry is not `HH:MM` or `HH:MM:SS`.
    MalformedTime { section: &'static str, value: String },
    /// `day_of_week` entry is not a weekday name.
    UnknownWeekday { section: &'static str, value: String },
    /// An enabled schedule lists no weekday.
    EmptyWeekdays(&'static str),
    /// An enabled schedule lists no time of day.
    EmptyInstants(&'static str),
    /// An interval or duration field is zero.
    ZeroInterval(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(msg) => write!(f, "unreadable config: {}", msg),
            Self::UnknownMetric(name) => write!(f, "unknown metric name '{}'", name),
            Self::UnknownLimit(limit) => write!(f, "unknown limit '{}' (expected upper or lower)", limit),
            Self::InvalidThreshold { metric, section } => {
                write!(f, "{}: threshold for {} is not a finite number", section, metric)
            }
            Self::MalformedTime { section, value } => {
                write!(f, "{}: malformed time '{}' (expected HH:MM[:SS])", section, value)
            }
            Self::UnknownWeekday { section, value } => {
                write!(f, "{}: unknown weekday '{}'", section, value)
            }
            Self::EmptyWeekdays(section) => write!(f, "{}: day_of_week is empty", section),
            Self::EmptyInstants(section) => write!(f, "{}: at_time is empty", section),
            Self::ZeroInterval(field) => write!(f, "{} must be greater than zero", field),
        }
    }
}

impl std::error::Error for ConfigError {}
