//! Action dispatcher.
//!
//! Turns a tick's violations into side effects, one per eligible rule
//! identity, through a [`ViolationAction`] collaborator.  The dispatcher
//! owns the [`DebounceStore`] and never does I/O itself.
//!
//! ```text
//!  violations ──▶ claim(id) ──granted──▶ action.perform() ──ok──▶ commit
//!                    │                          │
//!                 refused                     error
//!                    ▼                          ▼
//!               suppressed             released (retry next tick)
//! ```

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::app::ports::{AlertMessage, MailPort, RelayPort};
use crate::debounce::{ConsumerCategory, DebounceStore, RuleIdentity};
use crate::error::ActionError;
use crate::evaluator::ViolationEvent;

/// The side effect run for each eligible violation.
pub trait ViolationAction {
    fn perform(&mut self, violation: &ViolationEvent) -> Result<(), ActionError>;
}

/// Per-call outcome, one entry per violation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DispatchReport {
    pub fired: Vec<RuleIdentity>,
    pub suppressed: Vec<RuleIdentity>,
    pub failed: Vec<(RuleIdentity, ActionError)>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty() && self.suppressed.is_empty() && self.failed.is_empty()
    }
}

/// Debounced dispatch of violations.
#[derive(Default)]
pub struct ActionDispatcher {
    store: DebounceStore,
}

impl ActionDispatcher {
    pub fn new(store: DebounceStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DebounceStore {
        &self.store
    }

    /// Run `action` once for every violation whose rule identity is out of
    /// its skip interval.
    ///
    /// Violations are tried in order of decreasing magnitude, so when
    /// several filters share an identity the tightest violated threshold
    /// is the one acted on.  Ties keep their list order.
    ///
    /// The debounce record is committed only after `action` succeeds.  A
    /// later violation with the same identity in the same call is refused
    /// because the first one already committed.
    pub fn dispatch(
        &self,
        violations: &[ViolationEvent],
        consumer: ConsumerCategory,
        skip_minutes: u32,
        now: NaiveDateTime,
        action: &mut dyn ViolationAction,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let mut ordered: Vec<&ViolationEvent> = violations.iter().collect();
        ordered.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));

        for violation in ordered {
            let id = RuleIdentity::new(consumer, violation.filter.metric, violation.filter.direction);

            let Some(claim) = self.store.claim(id, now, skip_minutes) else {
                debug!("Dispatch: {} suppressed", id);
                report.suppressed.push(id);
                continue;
            };

            match action.perform(violation) {
                Ok(()) => {
                    info!(
                        "Dispatch: {} fired ({} {} {}, value {:.1})",
                        claim.identity(),
                        violation.filter.metric,
                        violation.filter.direction,
                        violation.filter.threshold,
                        violation.reading.value
                    );
                    claim.commit();
                    report.fired.push(id);
                }
                Err(e) => {
                    warn!("Dispatch: {} failed, not committed: {}", claim.identity(), e);
                    drop(claim);
                    report.failed.push((id, e));
                }
            }
        }

        report
    }
}

// ── Consumer actions ──────────────────────────────────────────

/// Alert consumer: one mail per violation.
pub struct MailAlert<'a, M: MailPort + ?Sized>(pub &'a mut M);

impl<M: MailPort + ?Sized> ViolationAction for MailAlert<'_, M> {
    fn perform(&mut self, violation: &ViolationEvent) -> Result<(), ActionError> {
        self.0.send_alert(&AlertMessage {
            metric: violation.filter.metric,
            direction: violation.filter.direction,
            threshold: violation.filter.threshold,
            value: violation.reading.value,
            unit: violation.reading.unit,
        })
    }
}

/// Relay consumer: switch the relay on for a fixed duration.
pub struct RelayActivation<'a, R: RelayPort + ?Sized> {
    pub relay: &'a mut R,
    pub duration_minutes: u32,
    pub now: NaiveDateTime,
}

impl<R: RelayPort + ?Sized> ViolationAction for RelayActivation<'_, R> {
    fn perform(&mut self, _violation: &ViolationEvent) -> Result<(), ActionError> {
        self.relay.activate(self.duration_minutes, self.now)
    }
}
