//! Mock collaborators for integration tests.
//!
//! Records every mail, relay and camera call so tests can assert on the
//! full action history, with switchable failure injection per port.

use chrono::{NaiveDate, NaiveDateTime};
use envmon::app::events::AppEvent;
use envmon::app::ports::{AlertMessage, CameraPort, CameraSettings, EventSink, MailPort, RelayPort, TimePort};
use envmon::config::{MonitorConfig, RawConfig};
use envmon::error::ActionError;
use std::cell::Cell;

// ── Action call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActionCall {
    Alert(AlertMessage),
    Summary { period_days: u32 },
    RelayOn { minutes: u32, at: NaiveDateTime },
    RelayOff,
    Cleanup,
    Capture { at: NaiveDateTime },
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<ActionCall>,
    pub fail_mail: bool,
    pub fail_relay: bool,
    pub fail_camera: bool,
    pub serviced: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<&AlertMessage> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActionCall::Alert(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub fn relay_activations(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActionCall::RelayOn { .. }))
            .count()
    }

    pub fn summaries(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActionCall::Summary { .. }))
            .count()
    }

    pub fn captures(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActionCall::Capture { .. }))
            .count()
    }
}

impl MailPort for MockHardware {
    fn send_alert(&mut self, alert: &AlertMessage) -> Result<(), ActionError> {
        if self.fail_mail {
            return Err(ActionError::Delivery("mock smtp down".into()));
        }
        self.calls.push(ActionCall::Alert(alert.clone()));
        Ok(())
    }

    fn send_summary(&mut self, period_days: u32) -> Result<(), ActionError> {
        if self.fail_mail {
            return Err(ActionError::Delivery("mock smtp down".into()));
        }
        self.calls.push(ActionCall::Summary { period_days });
        Ok(())
    }
}

impl RelayPort for MockHardware {
    fn activate(&mut self, duration_minutes: u32, now: NaiveDateTime) -> Result<(), ActionError> {
        if self.fail_relay {
            return Err(ActionError::Hardware("mock relay stuck"));
        }
        self.calls.push(ActionCall::RelayOn {
            minutes: duration_minutes,
            at: now,
        });
        Ok(())
    }

    fn service(&mut self, _now: NaiveDateTime) {
        self.serviced += 1;
    }

    fn deactivate(&mut self) -> Result<(), ActionError> {
        self.calls.push(ActionCall::RelayOff);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.calls.push(ActionCall::Cleanup);
    }
}

impl CameraPort for MockHardware {
    fn capture(&mut self, _settings: &CameraSettings, now: NaiveDateTime) -> Result<(), ActionError> {
        if self.fail_camera {
            return Err(ActionError::Capture("mock camera busy".into()));
        }
        self.calls.push(ActionCall::Capture { at: now });
        Ok(())
    }
}

// ── Recording sink ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Fake clock ────────────────────────────────────────────────

/// Clock that advances by the requested pause instead of sleeping.
pub struct FakeClock {
    now: Cell<NaiveDateTime>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self { now: Cell::new(start) }
    }
}

impl TimePort for FakeClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }

    fn pause(&self, period: core::time::Duration) {
        let step = chrono::Duration::from_std(period).unwrap_or_else(|_| chrono::Duration::seconds(1));
        self.now.set(self.now.get() + step);
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// 2024-06-10 is a Monday.
#[allow(dead_code)]
pub fn monday(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 10)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

/// Build a validated config from an inline JSON document.
#[allow(dead_code)]
pub fn config_from(doc: serde_json::Value) -> MonitorConfig {
    let raw: RawConfig = serde_json::from_value(doc).unwrap();
    MonitorConfig::from_raw(&raw).unwrap()
}
