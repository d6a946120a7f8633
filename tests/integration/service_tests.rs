//! Integration tests for the MonitorService tick pipeline.
//!
//! sensors → evaluator → debounce → mail / relay, plus weekly jobs, all
//! against mock collaborators on the host.

use chrono::Duration;
use serde_json::json;

use envmon::app::events::AppEvent;
use envmon::app::ports::{EventSink, ScheduledJob};
use envmon::app::runner::{Runner, Shutdown};
use envmon::app::service::MonitorService;
use envmon::debounce::{ConsumerCategory, RuleIdentity};
use envmon::error::SensorError;
use envmon::evaluator::BoundDirection;
use envmon::sensors::sim::SimSensor;
use envmon::sensors::{Metric, SensorHub};

use crate::mock_hw::{config_from, monday, ActionCall, FakeClock, MockHardware, RecordingSink};

struct Rig {
    service: MonitorService,
    hw: MockHardware,
    sink: RecordingSink,
    temperature: SimSensor,
    humidity: SimSensor,
    co2: SimSensor,
}

fn rig(doc: serde_json::Value) -> Rig {
    let temperature = SimSensor::new(Metric::Temperature, 22.0);
    let humidity = SimSensor::new(Metric::Humidity, 45.0);
    let co2 = SimSensor::new(Metric::Co2, 600.0);

    let mut hub = SensorHub::new();
    hub.attach(Box::new(temperature.clone()));
    hub.attach(Box::new(humidity.clone()));
    hub.attach(Box::new(co2.clone()));

    let mut service = MonitorService::new(config_from(doc), hub);
    let mut sink = RecordingSink::new();
    service.start(&mut sink);

    Rig {
        service,
        hw: MockHardware::new(),
        sink,
        temperature,
        humidity,
        co2,
    }
}

fn alert_doc(skip: u32) -> serde_json::Value {
    json!({
        "mail": {
            "to_address": "ops@example.org",
            "alert": {
                "use": true,
                "skip_interval_minutes": skip,
                "filters": [
                    { "name": "temperature", "limit": "upper", "threshold": 35.0 },
                    { "name": "humidity", "limit": "lower", "threshold": 20.0 }
                ]
            }
        }
    })
}

impl Rig {
    fn tick(&mut self, at: chrono::NaiveDateTime) -> envmon::app::events::TickSummary {
        self.service.tick(at, &mut self.hw, &mut self.sink)
    }
}

// ── Threshold evaluation ──────────────────────────────────────

#[test]
fn reading_above_upper_threshold_sends_one_alert() {
    let mut r = rig(alert_doc(60));
    r.temperature.set(36.0);

    let summary = r.tick(monday(9, 0, 0));

    assert_eq!(summary.violations, 1);
    assert_eq!(summary.fired, 1);
    let alerts = r.hw.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric, Metric::Temperature);
    assert_eq!(alerts[0].direction, BoundDirection::Upper);
    assert_eq!(alerts[0].value, 36.0);
    assert_eq!(alerts[0].unit, "C");
}

#[test]
fn reading_equal_to_threshold_is_not_a_violation() {
    let mut r = rig(alert_doc(60));
    r.temperature.set(35.0);

    let summary = r.tick(monday(9, 0, 0));

    assert_eq!(summary.violations, 0);
    assert!(r.hw.alerts().is_empty());
}

// ── Debounce ──────────────────────────────────────────────────

#[test]
fn skip_interval_suppresses_repeat_alerts() {
    let mut r = rig(alert_doc(120));
    r.temperature.set(36.0);
    let t = monday(9, 0, 0);

    assert_eq!(r.tick(t).fired, 1);

    let again = r.tick(t + Duration::minutes(60));
    assert_eq!(again.fired, 0);
    assert_eq!(again.suppressed, 1);

    assert_eq!(r.tick(t + Duration::minutes(121)).fired, 1);
    assert_eq!(r.hw.alerts().len(), 2);
}

#[test]
fn failed_delivery_is_retried_next_tick() {
    let mut r = rig(alert_doc(120));
    r.temperature.set(36.0);
    r.hw.fail_mail = true;
    let t = monday(9, 0, 0);

    let first = r.tick(t);
    assert_eq!(first.failed, 1);
    assert!(r.hw.alerts().is_empty());
    assert_eq!(
        r.sink.count(|e| matches!(e, AppEvent::ActionFailed { .. })),
        1
    );

    r.hw.fail_mail = false;
    let second = r.tick(t + Duration::minutes(10));
    assert_eq!(second.fired, 1, "no debounce record after a failure");
    assert_eq!(r.hw.alerts().len(), 1);
}

#[test]
fn alert_identities_debounce_independently() {
    let mut r = rig(alert_doc(120));
    let t = monday(9, 0, 0);

    r.temperature.set(36.0);
    assert_eq!(r.tick(t).fired, 1);

    r.humidity.set(15.0);
    let summary = r.tick(t + Duration::minutes(10));
    assert_eq!(summary.fired, 1, "humidity/lower has its own record");
    assert_eq!(summary.suppressed, 1, "temperature/upper still suppressed");
}

// ── Sensor failures ───────────────────────────────────────────

#[test]
fn failing_sensor_does_not_block_other_metrics() {
    let mut r = rig(alert_doc(60));
    r.temperature.fail_with(Some(SensorError::BusReadFailed));
    r.humidity.set(10.0);

    let summary = r.tick(monday(9, 0, 0));

    assert_eq!(summary.readings.len(), 2);
    assert_eq!(summary.fired, 1);
    assert_eq!(r.hw.alerts()[0].metric, Metric::Humidity);
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            AppEvent::SensorFailed {
                metric: Metric::Temperature,
                ..
            }
        )),
        1
    );
}

// ── Relay consumer ────────────────────────────────────────────

#[test]
fn relay_condition_switches_relay_separately_from_alerts() {
    let mut r = rig(json!({
        "mail": {
            "to_address": "ops@example.org",
            "alert": {
                "use": true,
                "filters": [{ "name": "co2", "limit": "upper", "threshold": 1000.0 }]
            }
        },
        "module": {
            "relay_module": {
                "turn_on_minutes": 5,
                "conditions": {
                    "use": true,
                    "skip_interval_minutes": 30,
                    "filters": [{ "name": "co2", "limit": "upper", "threshold": 1000.0 }]
                }
            }
        }
    }));
    r.co2.set(1400.0);
    let t = monday(9, 0, 0);

    let summary = r.tick(t);
    assert!(summary.relay_triggered);
    assert_eq!(summary.fired, 2);
    assert_eq!(r.hw.alerts().len(), 1);
    assert!(r.hw.calls.contains(&ActionCall::RelayOn { minutes: 5, at: t }));

    // Relay skip (30) is shorter than the alert default (60).
    let later = r.tick(t + Duration::minutes(40));
    assert!(later.relay_triggered);
    assert_eq!(r.hw.relay_activations(), 2);
    assert_eq!(r.hw.alerts().len(), 1);
}

#[test]
fn failed_relay_activation_leaves_no_record_and_retries() {
    let mut r = rig(json!({
        "module": {
            "relay_module": {
                "turn_on_minutes": 5,
                "conditions": {
                    "use": true,
                    "skip_interval_minutes": 30,
                    "filters": [{ "name": "co2", "limit": "upper", "threshold": 1000.0 }]
                }
            }
        }
    }));
    let id = RuleIdentity::new(ConsumerCategory::Relay, Metric::Co2, BoundDirection::Upper);
    r.co2.set(1400.0);
    r.hw.fail_relay = true;
    let t = monday(9, 0, 0);

    let first = r.tick(t);
    assert_eq!(first.failed, 1);
    assert!(!first.relay_triggered);
    assert_eq!(r.hw.relay_activations(), 0);
    assert!(r.service.dispatcher().store().last_fired(id).is_none());
    assert_eq!(
        r.sink.count(|e| matches!(e, AppEvent::ActionFailed { id: failed, .. } if *failed == id)),
        1
    );

    r.hw.fail_relay = false;
    let next = t + Duration::minutes(10);
    let second = r.tick(next);
    assert!(second.relay_triggered, "inside the skip interval, yet nothing was recorded");
    assert!(r.hw.calls.contains(&ActionCall::RelayOn { minutes: 5, at: next }));
    assert_eq!(r.service.dispatcher().store().last_fired(id), Some(next));
}

// ── Weekly jobs ───────────────────────────────────────────────

fn summary_doc() -> serde_json::Value {
    json!({
        "mail": {
            "to_address": "ops@example.org",
            "summary": {
                "use": true,
                "from_days": 3,
                "scheduler": {
                    "day_of_week": ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"],
                    "at_time": "08:30:00"
                }
            }
        }
    })
}

#[test]
fn summary_mail_runs_within_one_interval_of_instant() {
    let mut r = rig(summary_doc());

    r.tick(monday(8, 29, 0));
    assert_eq!(r.hw.summaries(), 0);

    r.tick(monday(8, 31, 0));
    assert!(r.hw.calls.contains(&ActionCall::Summary { period_days: 3 }));

    r.tick(monday(8, 35, 0));
    assert_eq!(r.hw.summaries(), 1, "once per occurrence");
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            AppEvent::ScheduleFired {
                job: ScheduledJob::SummaryMail,
                ..
            }
        )),
        1
    );
}

#[test]
fn failed_summary_retries_within_the_same_span() {
    let mut r = rig(summary_doc());
    r.hw.fail_mail = true;
    r.tick(monday(8, 30, 0));
    assert_eq!(r.hw.summaries(), 0);

    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            AppEvent::ScheduleFailed {
                job: ScheduledJob::SummaryMail,
                ..
            }
        )),
        1
    );

    r.hw.fail_mail = false;
    r.tick(monday(8, 36, 0));
    assert_eq!(r.hw.summaries(), 1);
    assert_eq!(
        r.sink.count(|e| matches!(e, AppEvent::ScheduleFired { .. })),
        1
    );
}

#[test]
fn relay_and_camera_schedules_run_on_their_days() {
    let mut r = rig(json!({
        "module": {
            "relay_module": {
                "turn_on_minutes": 2,
                "scheduler": { "use": true, "day_of_week": ["monday"], "at_time": ["07:00"] }
            },
            "web_camera_module": {
                "use": true,
                "settings": { "resolution": "640x480" },
                "scheduler": { "day_of_week": ["tuesday"], "at_time": ["07:00"] }
            }
        }
    }));

    let t = monday(7, 5, 0);
    r.tick(t);
    assert!(r.hw.calls.contains(&ActionCall::RelayOn { minutes: 2, at: t }));
    assert_eq!(r.hw.captures(), 0, "camera is Tuesday only");

    r.tick(t + Duration::days(1));
    assert_eq!(r.hw.captures(), 1);
    assert_eq!(r.hw.relay_activations(), 1);
}

#[test]
fn failed_capture_retries_within_the_same_span() {
    let mut r = rig(json!({
        "module": {
            "web_camera_module": {
                "use": true,
                "settings": { "resolution": "640x480" },
                "scheduler": { "day_of_week": ["tuesday"], "at_time": ["07:00"] }
            }
        }
    }));
    let tuesday = monday(7, 0, 0) + Duration::days(1);

    r.hw.fail_camera = true;
    r.tick(tuesday);
    assert_eq!(r.hw.captures(), 0);
    assert_eq!(
        r.sink.count(|e| matches!(
            e,
            AppEvent::ScheduleFailed {
                job: ScheduledJob::CameraCapture,
                ..
            }
        )),
        1
    );

    r.hw.fail_camera = false;
    let retry = tuesday + Duration::minutes(6);
    r.tick(retry);
    assert_eq!(r.hw.calls, vec![ActionCall::Capture { at: retry }]);

    r.tick(tuesday + Duration::minutes(9));
    assert_eq!(r.hw.captures(), 1, "once per occurrence");
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn shutdown_switches_relay_off_and_releases_it() {
    let mut r = rig(alert_doc(60));
    r.tick(monday(9, 0, 0));
    r.service.shutdown(&mut r.hw, &mut r.sink);

    let tail: Vec<_> = r.hw.calls.iter().rev().take(2).cloned().collect();
    assert_eq!(tail, vec![ActionCall::Cleanup, ActionCall::RelayOff]);
    assert!(matches!(r.sink.events.last(), Some(AppEvent::Stopped { ticks: 1 })));
}

/// Trips the shutdown flag after a given number of ticks.
struct StopAfter {
    inner: RecordingSink,
    ticks: usize,
    shutdown: Shutdown,
}

impl EventSink for StopAfter {
    fn emit(&mut self, event: &AppEvent) {
        if matches!(event, AppEvent::Tick(_)) {
            self.ticks -= 1;
            if self.ticks == 0 {
                self.shutdown.trigger();
            }
        }
        self.inner.emit(event);
    }
}

#[test]
fn runner_ticks_on_interval_boundaries_until_shutdown() {
    let r = rig(alert_doc(60));
    let clock = FakeClock::new(monday(9, 5, 0));
    let mut hw = MockHardware::new();
    let shutdown = Shutdown::new();
    let mut sink = StopAfter {
        inner: RecordingSink::new(),
        ticks: 3,
        shutdown: shutdown.clone(),
    };

    let mut runner = Runner::new(r.service);
    runner.run(&clock, &mut hw, &mut sink, &shutdown);

    let at: Vec<_> = sink
        .inner
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Tick(t) => Some(t.at),
            _ => None,
        })
        .collect();
    assert_eq!(at, vec![monday(9, 5, 0), monday(9, 10, 0), monday(9, 20, 0)]);
    assert_eq!(runner.service().tick_count(), 3);
    assert!(hw.serviced > 0, "relay auto-off serviced while idle");
    assert_eq!(hw.calls.last(), Some(&ActionCall::Cleanup));
}
