use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Handle to a repeating interval started through a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Handle to a pending animation-frame request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Process-wide timing resources used by the race clock and the ghost.
///
/// The scheduler only tracks handles. Whoever owns the scheduler routes each
/// fired interval or frame back into the race (`RaceOrchestrator::interval`
/// and `RaceOrchestrator::frame`), so the race state never lives inside a
/// callback.
pub trait Scheduler {
    /// Wall-clock milliseconds.
    fn now_ms(&self) -> u64;
    fn start_interval(&mut self, period: Duration) -> TimerId;
    fn cancel_interval(&mut self, id: TimerId);
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

#[derive(Debug)]
struct IntervalSlot {
    period_ms: u64,
    next_due_ms: u64,
}

/// Deterministic scheduler whose clock moves only when told to.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now_ms: u64,
    next_id: u64,
    intervals: BTreeMap<TimerId, IntervalSlot>,
    frames: BTreeSet<FrameId>,
}

impl ManualScheduler {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: start_ms,
            ..Self::default()
        }
    }

    pub fn active_intervals(&self) -> usize {
        self.intervals.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Move the clock forward by `ms`, firing every interval that falls due
    /// in time order. `on_fire` receives the scheduler back so it may cancel
    /// or start timers while the clock is being advanced.
    pub fn advance<F>(&mut self, ms: u64, mut on_fire: F)
    where
        F: FnMut(&mut Self, TimerId),
    {
        let target = self.now_ms + ms;
        while let Some((id, due)) = self.next_due(target) {
            self.now_ms = due;
            if let Some(slot) = self.intervals.get_mut(&id) {
                slot.next_due_ms += slot.period_ms;
            }
            on_fire(self, id);
        }
        self.now_ms = target;
    }

    /// Move the clock forward by `ms` and deliver one animation frame for
    /// every request pending at that moment.
    pub fn advance_frame<F>(&mut self, ms: u64, mut on_frame: F)
    where
        F: FnMut(&mut Self, FrameId),
    {
        self.now_ms += ms;
        let pending = std::mem::take(&mut self.frames);
        for id in pending {
            on_frame(self, id);
        }
    }

    fn next_due(&self, target: u64) -> Option<(TimerId, u64)> {
        self.intervals
            .iter()
            .filter(|(_, slot)| slot.next_due_ms <= target)
            .min_by_key(|(id, slot)| (slot.next_due_ms, **id))
            .map(|(id, slot)| (*id, slot.next_due_ms))
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.allocate());
        let period_ms = (period.as_millis() as u64).max(1);
        self.intervals.insert(
            id,
            IntervalSlot {
                period_ms,
                next_due_ms: self.now_ms + period_ms,
            },
        );
        id
    }

    fn cancel_interval(&mut self, id: TimerId) {
        self.intervals.remove(&id);
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.allocate());
        self.frames.insert(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.frames.remove(&id);
    }
}
