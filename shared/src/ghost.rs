use std::fmt;

use crate::schedule::{FrameId, Scheduler};

/// Pace of the ghost when the event has no scores yet.
pub const DEFAULT_GHOST_CPS: f64 = 3.5;

/// Where the ghost's pace came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GhostPace {
    /// CPS of the event's current leader.
    Leader(f64),
    /// The leaderboard is empty.
    Default,
    /// The leader could not be fetched; no ghost is shown.
    Unavailable,
}

impl GhostPace {
    pub fn cps(self) -> Option<f64> {
        match self {
            GhostPace::Leader(cps) => Some(cps),
            GhostPace::Default => Some(DEFAULT_GHOST_CPS),
            GhostPace::Unavailable => None,
        }
    }
}

/// Projects a constant-pace opponent onto the text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GhostProjector {
    pace_cps: f64,
    total_chars: usize,
}

impl GhostProjector {
    pub fn new(pace_cps: f64, total_chars: usize) -> Self {
        Self {
            pace_cps,
            total_chars,
        }
    }

    pub fn pace_cps(&self) -> f64 {
        self.pace_cps
    }

    /// Ghost progress in `[0, 1]` after `elapsed_secs`.
    pub fn position(&self, elapsed_secs: f64) -> f64 {
        let total = self.total_chars.max(1) as f64;
        (self.pace_cps * elapsed_secs / total).clamp(0.0, 1.0)
    }

    /// Seconds the ghost needs for the whole text.
    pub fn finish_seconds(&self) -> f64 {
        self.total_chars as f64 / self.pace_cps.max(0.1)
    }
}

/// Signed lead of the player over the ghost, in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indicator(pub i64);

impl Indicator {
    pub fn between(player_ratio: f64, ghost_ratio: f64, total_chars: usize) -> Self {
        Indicator(((player_ratio - ghost_ratio) * total_chars as f64).round() as i64)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Elapsed time seen by the ghost.
///
/// While the race runs it is refreshed on every animation frame from the
/// wall clock. Otherwise it sits at the coarse second count of the race
/// clock.
#[derive(Debug)]
pub struct GhostTracker {
    elapsed_secs: f64,
    limit_secs: f64,
    started_at_ms: Option<u64>,
    frame: Option<FrameId>,
}

impl GhostTracker {
    pub fn new(limit_secs: u32) -> Self {
        Self {
            elapsed_secs: 0.0,
            limit_secs: f64::from(limit_secs),
            started_at_ms: None,
            frame: None,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn is_animating(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Begin per-frame updates from `started_at_ms`.
    pub fn resume(&mut self, scheduler: &mut dyn Scheduler, started_at_ms: u64) {
        self.started_at_ms = Some(started_at_ms);
        if self.frame.is_none() {
            self.frame = Some(scheduler.request_frame());
        }
    }

    pub fn on_frame(&mut self, scheduler: &mut dyn Scheduler) {
        self.frame = None;
        let Some(start) = self.started_at_ms else {
            return;
        };
        let elapsed = scheduler.now_ms().saturating_sub(start) as f64 / 1000.0;
        self.elapsed_secs = elapsed.min(self.limit_secs);
        self.frame = Some(scheduler.request_frame());
    }

    /// Coarse elapsed from a clock tick; only used while not animating.
    pub fn sync_coarse(&mut self, elapsed_secs: u32) {
        if !self.is_animating() {
            self.elapsed_secs = f64::from(elapsed_secs);
        }
    }

    /// Stop animating and settle on the coarse value.
    pub fn freeze(&mut self, scheduler: &mut dyn Scheduler, elapsed_secs: u32) {
        self.cancel(scheduler);
        self.elapsed_secs = f64::from(elapsed_secs);
    }

    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        self.started_at_ms = None;
        if let Some(id) = self.frame.take() {
            scheduler.cancel_frame(id);
        }
    }
}
