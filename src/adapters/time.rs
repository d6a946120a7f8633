//! Wall-clock time adapter.
//!
//! Schedules are written in local time ("Monday 08:30"), so the clock hands
//! out local naive timestamps.

use chrono::{Local, NaiveDateTime};

use crate::app::ports::TimePort;

/// [`TimePort`] backed by the host's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl TimePort for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
