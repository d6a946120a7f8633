//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to the
//! `log` facade.  A spreadsheet or MQTT adapter would implement the same
//! trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Tick(t) => {
                let readings: Vec<String> = t
                    .readings
                    .iter()
                    .map(|r| format!("{}={:.1}{}", r.metric, r.value, r.unit))
                    .collect();
                info!(
                    "TICK | {} | {} | violations={} fired={} suppressed={} failed={} relay={}",
                    t.at.format("%Y-%m-%d %H:%M:%S"),
                    readings.join(" "),
                    t.violations,
                    t.fired,
                    t.suppressed,
                    t.failed,
                    if t.relay_triggered { "ON" } else { "-" },
                );
            }
            AppEvent::SensorFailed { metric, error } => {
                warn!("SENSOR | {} read failed: {}", metric, error);
            }
            AppEvent::ActionFired(id) => {
                info!("ACTION | {} fired", id);
            }
            AppEvent::ActionFailed { id, error } => {
                warn!("ACTION | {} failed: {}", id, error);
            }
            AppEvent::ScheduleFired { label, job } => {
                info!("SCHEDULE | {} ran {:?}", label, job);
            }
            AppEvent::ScheduleFailed { label, job, error } => {
                warn!("SCHEDULE | {} {:?} failed: {}", label, job, error);
            }
            AppEvent::Started {
                interval_minutes,
                metrics,
            } => {
                let names: Vec<&str> = metrics.iter().map(|m| m.name()).collect();
                info!("START | every {} min | metrics: {}", interval_minutes, names.join(", "));
            }
            AppEvent::Stopped { ticks } => {
                info!("STOP | after {} tick(s)", ticks);
            }
        }
    }
}
