//! Polling run loop.
//!
//! Drives [`MonitorService::tick`] on the polling interval until a
//! [`Shutdown`] is requested.
//!
//! ```text
//!            timer due                 tick finished
//!   Idle ─────────────────▶ Ticking ─────────────────▶ Idle
//!    │
//!    │ shutdown requested (checked only while Idle)
//!    ▼
//!  service.shutdown()  →  return
//! ```
//!
//! Ticks are aligned to multiples of the interval since midnight (an
//! interval of 10 ticks at :00, :10, :20 …), with one extra tick right at
//! startup.  While idle the loop wakes every [`POLL_PERIOD`] to service the
//! relay's auto-off and to notice shutdown.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration as StdDuration;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Timelike};
use log::{debug, info};

use super::ports::{CameraPort, EventSink, MailPort, RelayPort, TimePort};
use super::service::MonitorService;

/// Idle wake-up period.
pub const POLL_PERIOD: StdDuration = StdDuration::from_secs(1);

/// Cloneable shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Ticking,
}

/// Owns the tick timer around a [`MonitorService`].
pub struct Runner {
    service: MonitorService,
    state: RunState,
    next_tick: Option<NaiveDateTime>,
}

impl Runner {
    pub fn new(service: MonitorService) -> Self {
        Self {
            service,
            state: RunState::Idle,
            next_tick: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn service(&self) -> &MonitorService {
        &self.service
    }

    /// Run until `shutdown` is triggered.  A tick already started always
    /// completes before the flag is looked at again.
    pub fn run<H, S>(&mut self, clock: &impl TimePort, hw: &mut H, sink: &mut S, shutdown: &Shutdown)
    where
        H: MailPort + RelayPort + CameraPort,
        S: EventSink,
    {
        self.service.start(sink);

        while !shutdown.is_triggered() {
            let now = clock.now();
            hw.service(now);
            self.poll(now, hw, sink);
            clock.pause(POLL_PERIOD);
        }

        info!("Runner: shutdown requested, draining");
        self.service.shutdown(hw, sink);
    }

    /// One pass of the loop body: tick if the timer is due.  Returns `true`
    /// if a tick ran.
    pub fn poll<H, S>(&mut self, now: NaiveDateTime, hw: &mut H, sink: &mut S) -> bool
    where
        H: MailPort + RelayPort + CameraPort,
        S: EventSink,
    {
        let interval = Duration::minutes(i64::from(self.service.interval_minutes()));

        let due = match self.next_tick {
            None => true,
            // Wall clock stepped back by more than one interval: re-align.
            Some(next) if next - now > interval => {
                self.next_tick = Some(next_boundary(now, self.service.interval_minutes()));
                false
            }
            Some(next) => now >= next,
        };
        if !due {
            return false;
        }

        self.state = RunState::Ticking;
        debug!("Runner: Idle -> Ticking at {}", now);
        self.service.tick(now, hw, sink);
        self.state = RunState::Idle;
        debug!("Runner: Ticking -> Idle");

        // Missed boundaries are skipped rather than replayed.
        self.next_tick = Some(next_boundary(now, self.service.interval_minutes()));
        true
    }
}

/// First multiple of `interval_minutes` since midnight strictly after `now`.
pub fn next_boundary(now: NaiveDateTime, interval_minutes: u32) -> NaiveDateTime {
    let span = i64::from(interval_minutes.max(1)) * 60;
    let secs = i64::from(now.time().num_seconds_from_midnight());
    let midnight = now.date().and_time(chrono::NaiveTime::MIN);
    midnight + Duration::seconds((secs / span + 1) * span)
}
