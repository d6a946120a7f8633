//! Application service, the hexagonal core.
//!
//! [`MonitorService`] owns the sensor hub, the debounced dispatcher and
//! the job scheduler.  All side effects flow through port traits injected
//! at call sites, making the whole tick testable with mock adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        MonitorService         │
//!  MailPort   ◀── │ Evaluator · Debounce · Sched  │
//!  RelayPort  ◀── │                               │
//!  CameraPort ◀── └──────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use log::{info, warn};

use crate::config::MonitorConfig;
use crate::debounce::ConsumerCategory;
use crate::dispatch::{ActionDispatcher, DispatchReport, MailAlert, RelayActivation};
use crate::error::ActionError;
use crate::evaluator::evaluate_all;
use crate::scheduler::{Schedule, Scheduler};
use crate::sensors::SensorHub;

use super::events::{AppEvent, TickSummary};
use super::ports::{CameraPort, EventSink, MailPort, RelayPort, ScheduledJob, SchedulerDelegate};

// ───────────────────────────────────────────────────────────────
// MonitorService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct MonitorService {
    config: MonitorConfig,
    hub: SensorHub,
    dispatcher: ActionDispatcher,
    scheduler: Scheduler,
    tick_count: u64,
}

impl MonitorService {
    /// Construct the service from validated configuration and a populated
    /// sensor hub.
    pub fn new(config: MonitorConfig, hub: SensorHub) -> Self {
        let mut scheduler = Scheduler::new(config.interval_minutes);
        if let Some(summary) = &config.summary {
            scheduler.add(Schedule {
                label: "summary-mail",
                job: ScheduledJob::SummaryMail,
                window: summary.window.clone(),
            });
        }
        if let Some(window) = config.relay.as_ref().and_then(|r| r.schedule.as_ref()) {
            scheduler.add(Schedule {
                label: "relay-module",
                job: ScheduledJob::RelayActivation,
                window: window.clone(),
            });
        }
        if let Some(camera) = &config.camera {
            scheduler.add(Schedule {
                label: "web-camera",
                job: ScheduledJob::CameraCapture,
                window: camera.window.clone(),
            });
        }

        for metric in config.filtered_metrics() {
            if !hub.serves(metric) {
                warn!("Filters on {} can never fire: no enabled sensor reports it", metric);
            }
        }

        Self {
            config,
            hub,
            dispatcher: ActionDispatcher::default(),
            scheduler,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let metrics = self.hub.metrics();
        info!(
            "MonitorService started: every {} min, {} metric(s), {} schedule(s)",
            self.config.interval_minutes,
            metrics.len(),
            self.scheduler.len()
        );
        sink.emit(&AppEvent::Started {
            interval_minutes: self.config.interval_minutes,
            metrics,
        });
    }

    /// Switch the relay off and release it.  Call once, after the last tick.
    pub fn shutdown(&mut self, hw: &mut impl RelayPort, sink: &mut impl EventSink) {
        if let Err(e) = hw.deactivate() {
            warn!("Relay switch-off on shutdown failed: {}", e);
        }
        hw.cleanup();
        sink.emit(&AppEvent::Stopped {
            ticks: self.tick_count,
        });
        info!("MonitorService stopped after {} tick(s)", self.tick_count);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one polling cycle: read sensors → scheduled jobs → alert
    /// consumer → relay consumer.
    ///
    /// Nothing here returns an error: sensor and action failures are
    /// logged, reported as events, and retried on a later tick.
    pub fn tick(
        &mut self,
        now: NaiveDateTime,
        hw: &mut (impl MailPort + RelayPort + CameraPort),
        sink: &mut impl EventSink,
    ) -> TickSummary {
        self.tick_count += 1;

        // 1. Readings
        let (readings, failures) = self.hub.read_all(now);
        for failure in failures {
            sink.emit(&AppEvent::SensorFailed {
                metric: failure.metric,
                error: failure.error,
            });
        }

        // 2. Weekly jobs
        let mut runner = JobRunner {
            config: &self.config,
            now,
            hw: &mut *hw,
            sink: &mut *sink,
        };
        self.scheduler.tick(now, &mut runner);

        let mut summary = TickSummary {
            at: now,
            readings,
            violations: 0,
            fired: 0,
            suppressed: 0,
            failed: 0,
            relay_triggered: false,
        };

        // 3. Alert consumer
        if let Some(alert) = &self.config.alert {
            let violations = evaluate_all(&summary.readings, &alert.filters);
            summary.violations += violations.len();
            let report = self.dispatcher.dispatch(
                &violations,
                ConsumerCategory::Alert,
                alert.skip_interval_minutes,
                now,
                &mut MailAlert(&mut *hw),
            );
            record(&mut summary, &report, sink);
        }

        // 4. Relay consumer
        if let Some(relay) = &self.config.relay {
            if let Some(conditions) = &relay.conditions {
                let violations = evaluate_all(&summary.readings, &conditions.filters);
                summary.violations += violations.len();
                let report = self.dispatcher.dispatch(
                    &violations,
                    ConsumerCategory::Relay,
                    conditions.skip_interval_minutes,
                    now,
                    &mut RelayActivation {
                        relay: &mut *hw,
                        duration_minutes: relay.turn_on_minutes,
                        now,
                    },
                );
                summary.relay_triggered = !report.fired.is_empty();
                record(&mut summary, &report, sink);
            }
        }

        sink.emit(&AppEvent::Tick(summary.clone()));
        summary
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Polling period in minutes.
    pub fn interval_minutes(&self) -> u32 {
        self.config.interval_minutes
    }
}

fn record(summary: &mut TickSummary, report: &DispatchReport, sink: &mut impl EventSink) {
    summary.fired += report.fired.len();
    summary.suppressed += report.suppressed.len();
    summary.failed += report.failed.len();
    for id in &report.fired {
        sink.emit(&AppEvent::ActionFired(*id));
    }
    for (id, error) in &report.failed {
        sink.emit(&AppEvent::ActionFailed {
            id: *id,
            error: error.clone(),
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate
// ───────────────────────────────────────────────────────────────

/// Bridges the scheduler (which knows nothing about mail, relays or
/// cameras) to the action ports.
struct JobRunner<'a, H, S> {
    config: &'a MonitorConfig,
    now: NaiveDateTime,
    hw: &'a mut H,
    sink: &'a mut S,
}

impl<H, S> SchedulerDelegate for JobRunner<'_, H, S>
where
    H: MailPort + RelayPort + CameraPort,
    S: EventSink,
{
    fn on_schedule_fired(&mut self, label: &str, job: ScheduledJob) -> Result<(), ActionError> {
        let now = self.now;
        match job {
            ScheduledJob::SummaryMail => {
                let days = self.config.summary.as_ref().map_or(0, |s| s.from_days);
                self.hw.send_summary(days)?;
            }
            ScheduledJob::RelayActivation => {
                let minutes = self.config.relay.as_ref().map_or(0, |r| r.turn_on_minutes);
                self.hw.activate(minutes, now)?;
            }
            ScheduledJob::CameraCapture => {
                if let Some(camera) = &self.config.camera {
                    self.hw.capture(&camera.settings, now)?;
                }
            }
        }
        self.sink.emit(&AppEvent::ScheduleFired {
            label: label.to_string(),
            job,
        });
        Ok(())
    }

    fn on_schedule_failed(&mut self, label: &str, job: ScheduledJob, error: &ActionError) {
        self.sink.emit(&AppEvent::ScheduleFailed {
            label: label.to_string(),
            job,
            error: error.clone(),
        });
    }
}
