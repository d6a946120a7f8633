//! Weekly schedule gate and job scheduler.
//!
//! Runs next to the threshold pipeline.  Every polling tick, the
//! scheduler checks each job's [`TimeWindow`] and notifies a
//! [`SchedulerDelegate`] when a job is due; the service implements the
//! delegate and performs the side effect.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Scheduled jobs                           │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │   │ Summary mail│    │ Relay on    │    │ Camera shot │      │
//! │   └──────┬──────┘    └──────┬──────┘    └──────┬──────┘      │
//! │          └──────────────────┼──────────────────┘             │
//! │                             ▼                                │
//! │              is_due(window, now, interval)                   │
//! │                             │                                │
//! │                             ▼                                │
//! │                    SchedulerDelegate                         │
//! │               (MonitorService performs job)                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Window semantics
//!
//! An instant `t` is due for the half-open span `[t, t + interval)`.  With
//! ticks spaced exactly one interval apart, exactly one tick lands in that
//! span.  A span that crosses midnight belongs to the weekday on which `t`
//! occurred.  Each entry also remembers, per instant, the date it last
//! fired, so drifting or overlapping ticks never fire an instant twice on
//! the same day, and instants closer together than one interval all fire.

use core::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use log::{info, warn};

use crate::app::ports::{ScheduledJob, SchedulerDelegate};

const SECS_PER_DAY: i64 = 86_400;

// ═══════════════════════════════════════════════════════════════
//  Weekday set
// ═══════════════════════════════════════════════════════════════

/// Set of weekdays as a 7-bit mask (bit 0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const ALL: WeekdaySet = WeekdaySet(0b0111_1111);

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

// ═══════════════════════════════════════════════════════════════
//  Time window
// ═══════════════════════════════════════════════════════════════

/// Weekdays plus the times of day a job runs on each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub weekdays: WeekdaySet,
    /// Sorted, deduplicated.
    pub instants: Vec<NaiveTime>,
}

impl TimeWindow {
    pub fn new(weekdays: WeekdaySet, mut instants: Vec<NaiveTime>) -> Self {
        instants.sort_unstable();
        instants.dedup();
        Self { weekdays, instants }
    }

    /// Every instant whose span contains `now`, as `(instant index, date
    /// the instant occurred on)`.  Several instants closer together than
    /// one interval can be due at once.
    pub fn due_instants(&self, now: NaiveDateTime, interval_minutes: u32) -> impl Iterator<Item = (usize, NaiveDate)> + '_ {
        let span = i64::from(interval_minutes) * 60;
        let now_secs = i64::from(now.time().num_seconds_from_midnight());
        let active = !self.weekdays.is_empty() && interval_minutes > 0;

        self.instants
            .iter()
            .enumerate()
            .filter(move |_| active)
            .filter_map(move |(idx, &t)| {
                let t_secs = i64::from(t.num_seconds_from_midnight());
                let (delta, date) = if now_secs >= t_secs {
                    (now_secs - t_secs, now.date())
                } else {
                    (now_secs + SECS_PER_DAY - t_secs, now.date().pred_opt()?)
                };
                (delta < span && self.weekdays.contains(date.weekday())).then_some((idx, date))
            })
    }

    /// The earliest `(date, instant)` occurrence whose span contains `now`.
    pub fn due_occurrence(&self, now: NaiveDateTime, interval_minutes: u32) -> Option<(NaiveDate, NaiveTime)> {
        self.due_instants(now, interval_minutes)
            .next()
            .map(|(idx, date)| (date, self.instants[idx]))
    }
}

/// Pure gate: does `now` fall in one of `window`'s spans?
pub fn is_due(window: &TimeWindow, now: NaiveDateTime, interval_minutes: u32) -> bool {
    window.due_occurrence(now, interval_minutes).is_some()
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// A single schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g. "summary-mail").
    pub label: &'static str,
    pub job: ScheduledJob,
    pub window: TimeWindow,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({} day(s), {} instant(s))",
            self.label,
            self.window.weekdays.len(),
            self.window.instants.len()
        )
    }
}

/// One slot per job kind is plenty.
const MAX_SCHEDULES: usize = 4;

#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// Date each instant last fired on, indexed like `window.instants`.
    fired_on: Vec<Option<NaiveDate>>,
}

/// The scheduler engine.
///
/// Decoupled from the actions it triggers: when an entry is due it calls
/// the delegate, which makes the scheduler testable with a recording
/// delegate.
pub struct Scheduler {
    entries: heapless::Vec<ScheduleEntry, MAX_SCHEDULES>,
    interval_minutes: u32,
}

impl Scheduler {
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            entries: heapless::Vec::new(),
            interval_minutes,
        }
    }

    /// Add a schedule.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        let label = schedule.label;
        info!("Scheduler: added {}", schedule);
        let fired_on = vec![None; schedule.window.instants.len()];
        match self.entries.push(ScheduleEntry { schedule, fired_on }) {
            Ok(()) => Some(self.entries.len() - 1),
            Err(_) => {
                warn!("Scheduler: no free slot for '{}'", label);
                None
            }
        }
    }

    /// Number of registered schedules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every entry against `now`.  Call once per polling tick.
    ///
    /// A due entry is handed to the delegate; it is marked as fired for
    /// that occurrence only if the delegate reports success, so a failed
    /// job is retried by any later tick still inside the same span.
    pub fn tick(&mut self, now: NaiveDateTime, delegate: &mut dyn SchedulerDelegate) {
        for entry in &mut self.entries {
            let window = &entry.schedule.window;
            for (idx, date) in window.due_instants(now, self.interval_minutes) {
                if entry.fired_on[idx] == Some(date) {
                    continue;
                }

                let label = entry.schedule.label;
                info!("Scheduler: '{}' due ({} {})", label, date, window.instants[idx]);
                match delegate.on_schedule_fired(label, entry.schedule.job) {
                    Ok(()) => entry.fired_on[idx] = Some(date),
                    Err(e) => {
                        warn!("Scheduler: '{}' failed, will retry: {}", label, e);
                        delegate.on_schedule_failed(label, entry.schedule.job, &e);
                    }
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
