//! Outbound application events.
//!
//! The [`MonitorService`](super::service::MonitorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log them, append them to
//! a spreadsheet, publish them.

use chrono::NaiveDateTime;

use super::ports::ScheduledJob;
use crate::debounce::RuleIdentity;
use crate::error::{ActionError, SensorError};
use crate::sensors::{Metric, SensorReading};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service started (carries polling interval and sensor metrics).
    Started {
        interval_minutes: u32,
        metrics: Vec<Metric>,
    },

    /// One polling tick finished.
    Tick(TickSummary),

    /// A sensor channel failed this tick.
    SensorFailed { metric: Metric, error: SensorError },

    /// A debounced action fired.
    ActionFired(RuleIdentity),

    /// A debounced action failed and will be retried.
    ActionFailed { id: RuleIdentity, error: ActionError },

    /// A scheduled job ran.
    ScheduleFired { label: String, job: ScheduledJob },

    /// A scheduled job failed and stays due while its span is open.
    ScheduleFailed {
        label: String,
        job: ScheduledJob,
        error: ActionError,
    },

    /// The service stopped.
    Stopped { ticks: u64 },
}

/// Readings and outcome counts of one tick.
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub at: NaiveDateTime,
    pub readings: Vec<SensorReading>,
    pub violations: usize,
    pub fired: usize,
    pub suppressed: usize,
    pub failed: usize,
    /// True if the relay was switched on by a condition this tick.
    pub relay_triggered: bool,
}
