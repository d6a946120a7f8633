//! Debounce store.
//!
//! Remembers, per [`RuleIdentity`], when that rule last fired, and refuses
//! to fire it again until the consumer's skip interval has elapsed.
//!
//! ## Claim lifecycle
//!
//! 1. [`DebounceStore::claim`] checks the interval **and** reserves the
//!    identity inside one critical section.  While reserved, every other
//!    claim on the same identity is refused.
//! 2. The caller performs the side effect.
//! 3. On success, [`Claim::commit`] stores the fire time.  Dropping the
//!    claim without committing releases the reservation and leaves the
//!    previous record untouched, so a failed dispatch is retried on the
//!    next eligible tick.
//!
//! The table is keyed by a closed set (consumer × metric × direction), so
//! it is a fixed-capacity map and never grows past 20 entries.

use core::cell::RefCell;
use core::fmt;

use chrono::{Duration, NaiveDateTime};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::FnvIndexMap;
use log::{debug, warn};

use crate::evaluator::BoundDirection;
use crate::sensors::Metric;

// ═══════════════════════════════════════════════════════════════
//  Rule identity
// ═══════════════════════════════════════════════════════════════

/// Which downstream consumer a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConsumerCategory {
    /// Mail alert.
    Alert,
    /// Relay activation.
    Relay,
}

impl ConsumerCategory {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Relay => "relay",
        }
    }
}

impl fmt::Display for ConsumerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The debounce bucket a violation falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleIdentity {
    pub consumer: ConsumerCategory,
    pub metric: Metric,
    pub direction: BoundDirection,
}

impl RuleIdentity {
    pub const fn new(consumer: ConsumerCategory, metric: Metric, direction: BoundDirection) -> Self {
        Self {
            consumer,
            metric,
            direction,
        }
    }
}

impl fmt::Display for RuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.consumer, self.metric, self.direction)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Store
// ═══════════════════════════════════════════════════════════════

/// 2 consumers × 5 metrics × 2 directions, rounded up to a power of two.
const TABLE_CAP: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    last_fired: Option<NaiveDateTime>,
    in_flight: bool,
}

type Table = FnvIndexMap<RuleIdentity, Slot, TABLE_CAP>;

/// Per-identity last-fired table behind a single lock.
pub struct DebounceStore {
    table: Mutex<CriticalSectionRawMutex, RefCell<Table>>,
}

impl Default for DebounceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(FnvIndexMap::new())),
        }
    }

    /// True if `id` has never fired, or fired at least `skip_minutes` ago.
    ///
    /// Pure query; does not reserve anything.  Use [`claim`](Self::claim)
    /// when the answer is going to be acted on.
    pub fn should_fire(&self, id: RuleIdentity, now: NaiveDateTime, skip_minutes: u32) -> bool {
        self.table.lock(|cell| {
            let table = cell.borrow();
            interval_elapsed(table.get(&id).and_then(|s| s.last_fired), now, skip_minutes)
        })
    }

    /// Overwrite the last-fired time of `id`.
    pub fn record(&self, id: RuleIdentity, at: NaiveDateTime) {
        self.table.lock(|cell| {
            let mut table = cell.borrow_mut();
            upsert(&mut table, id, |slot| slot.last_fired = Some(at));
        });
    }

    /// Last committed fire time of `id`, if any.
    pub fn last_fired(&self, id: RuleIdentity) -> Option<NaiveDateTime> {
        self.table
            .lock(|cell| cell.borrow().get(&id).and_then(|s| s.last_fired))
    }

    /// Atomically check the interval and reserve `id`.
    ///
    /// Returns `None` when the rule is still inside its skip interval or
    /// another caller holds a claim on it.
    pub fn claim(&self, id: RuleIdentity, now: NaiveDateTime, skip_minutes: u32) -> Option<Claim<'_>> {
        let granted = self.table.lock(|cell| {
            let mut table = cell.borrow_mut();
            let slot = table.get(&id).copied().unwrap_or_default();
            if slot.in_flight || !interval_elapsed(slot.last_fired, now, skip_minutes) {
                return false;
            }
            upsert(&mut table, id, |slot| slot.in_flight = true)
        });

        if granted {
            debug!("Debounce: claimed {}", id);
            Some(Claim {
                store: self,
                id,
                at: now,
                committed: false,
            })
        } else {
            None
        }
    }

    fn finish(&self, id: RuleIdentity, fired_at: Option<NaiveDateTime>) {
        self.table.lock(|cell| {
            let mut table = cell.borrow_mut();
            if let Some(slot) = table.get_mut(&id) {
                slot.in_flight = false;
                if let Some(at) = fired_at {
                    slot.last_fired = Some(at);
                }
            }
        });
    }
}

/// A reservation on one rule identity.  See the module docs.
#[must_use = "dropping a claim without commit() releases it"]
pub struct Claim<'a> {
    store: &'a DebounceStore,
    id: RuleIdentity,
    at: NaiveDateTime,
    committed: bool,
}

impl Claim<'_> {
    pub fn identity(&self) -> RuleIdentity {
        self.id
    }

    /// Record the fire at the claim's timestamp and release the reservation.
    pub fn commit(mut self) {
        self.committed = true;
        self.store.finish(self.id, Some(self.at));
        debug!("Debounce: committed {} at {}", self.id, self.at);
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.store.finish(self.id, None);
            debug!("Debounce: released {} without commit", self.id);
        }
    }
}

// ── Internal ──────────────────────────────────────────────────

fn interval_elapsed(last: Option<NaiveDateTime>, now: NaiveDateTime, skip_minutes: u32) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= Duration::minutes(i64::from(skip_minutes)),
    }
}

/// Apply `f` to the slot for `id`, inserting an empty slot first if needed.
/// Returns `false` only if the table is full.
fn upsert(table: &mut Table, id: RuleIdentity, f: impl FnOnce(&mut Slot)) -> bool {
    if let Some(slot) = table.get_mut(&id) {
        f(slot);
        return true;
    }
    let mut slot = Slot::default();
    f(&mut slot);
    if table.insert(id, slot).is_err() {
        warn!("Debounce: table full, cannot track {}", id);
        return false;
    }
    true
}
