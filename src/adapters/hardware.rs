//! Action adapter. Bundles the outbound collaborators behind one value.
//!
//! [`MonitorService::tick`](crate::app::service::MonitorService::tick)
//! takes a single `hw` implementing every action port; this adapter
//! delegates each port to the concrete driver that owns it.

use chrono::NaiveDateTime;

use crate::app::ports::{AlertMessage, CameraPort, CameraSettings, MailPort, RelayPort};
use crate::error::ActionError;

/// Concrete adapter combining mail, relay and camera.
pub struct ActionAdapter<M, R, C> {
    pub mail: M,
    pub relay: R,
    pub camera: C,
}

impl<M, R, C> ActionAdapter<M, R, C> {
    pub fn new(mail: M, relay: R, camera: C) -> Self {
        Self { mail, relay, camera }
    }
}

// ── MailPort ──────────────────────────────────────────────────

impl<M: MailPort, R, C> MailPort for ActionAdapter<M, R, C> {
    fn send_alert(&mut self, alert: &AlertMessage) -> Result<(), ActionError> {
        self.mail.send_alert(alert)
    }

    fn send_summary(&mut self, period_days: u32) -> Result<(), ActionError> {
        self.mail.send_summary(period_days)
    }
}

// ── RelayPort ─────────────────────────────────────────────────

impl<M, R: RelayPort, C> RelayPort for ActionAdapter<M, R, C> {
    fn activate(&mut self, duration_minutes: u32, now: NaiveDateTime) -> Result<(), ActionError> {
        self.relay.activate(duration_minutes, now)
    }

    fn service(&mut self, now: NaiveDateTime) {
        self.relay.service(now);
    }

    fn deactivate(&mut self) -> Result<(), ActionError> {
        self.relay.deactivate()
    }

    fn cleanup(&mut self) {
        self.relay.cleanup();
    }
}

// ── CameraPort ────────────────────────────────────────────────

impl<M, R, C: CameraPort> CameraPort for ActionAdapter<M, R, C> {
    fn capture(&mut self, settings: &CameraSettings, now: NaiveDateTime) -> Result<(), ActionError> {
        self.camera.capture(settings, now)
    }
}
