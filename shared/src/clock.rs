use std::time::Duration;

use rust_fsm::StateMachineImpl;
use tracing::debug;

use crate::fsm::{ClockEvent, ClockState};
use crate::schedule::{Scheduler, TimerId};

pub const DEFAULT_RACE_SECONDS: u32 = 60;
/// Warning beep on the last three seconds.
pub const LOW_BEEP_HZ: u32 = 440;
/// Final beep, one octave above the warning beep.
pub const HIGH_BEEP_HZ: u32 = 880;

const TICK: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSignal {
    Tick(u32),
    Beep(u32),
    End,
}

/// Fixed-duration countdown that ticks once per second.
#[derive(Debug)]
pub struct RaceClock {
    duration: u32,
    remaining: u32,
    state: ClockState,
    timer: Option<TimerId>,
}

impl RaceClock {
    pub fn new(duration_seconds: u32) -> Self {
        Self {
            duration: duration_seconds,
            remaining: duration_seconds,
            state: ClockState::default(),
            timer: None,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.remaining
    }

    /// Whole seconds elapsed according to the ticks.
    pub fn elapsed_seconds(&self) -> u32 {
        self.duration - self.remaining
    }

    /// Start counting down. A clock that already started is left alone.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) -> Vec<ClockSignal> {
        if !self.consume(ClockEvent::Start) {
            return Vec::new();
        }
        self.remaining = self.duration;
        let mut signals = vec![ClockSignal::Tick(self.remaining)];
        if self.remaining == 0 {
            self.finish(scheduler, &mut signals);
        } else {
            self.timer = Some(scheduler.start_interval(TICK));
        }
        debug!(duration = self.duration, "race clock started");
        signals
    }

    /// One interval fire. Ignored unless the clock is running.
    pub fn on_interval(&mut self, scheduler: &mut dyn Scheduler) -> Vec<ClockSignal> {
        if self.state != ClockState::Running {
            return Vec::new();
        }
        self.remaining = self.remaining.saturating_sub(1);
        let mut signals = vec![ClockSignal::Tick(self.remaining)];
        match self.remaining {
            1..=3 => signals.push(ClockSignal::Beep(LOW_BEEP_HZ)),
            0 => self.finish(scheduler, &mut signals),
            _ => {}
        }
        signals
    }

    /// Stop without emitting anything further.
    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        self.clear_timer(scheduler);
        self.consume(ClockEvent::Cancel);
    }

    fn finish(&mut self, scheduler: &mut dyn Scheduler, signals: &mut Vec<ClockSignal>) {
        signals.push(ClockSignal::Beep(HIGH_BEEP_HZ));
        self.clear_timer(scheduler);
        if self.consume(ClockEvent::Expire) {
            signals.push(ClockSignal::End);
        }
    }

    fn clear_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel_interval(id);
        }
    }

    fn consume(&mut self, event: ClockEvent) -> bool {
        match ClockState::transition(&self.state, &event) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }
}

impl Default for RaceClock {
    fn default() -> Self {
        Self::new(DEFAULT_RACE_SECONDS)
    }
}
