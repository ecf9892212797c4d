//! One race screen: typing engine, countdown and ghost composed into a
//! single state machine that turns keystrokes into a submitted score.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rust_fsm::StateMachineImpl;
use tracing::{debug, info, warn};

use crate::clock::{ClockSignal, RaceClock, DEFAULT_RACE_SECONDS};
use crate::cps::race_cps;
use crate::fsm::{RaceEvent, RaceState};
use crate::ghost::{GhostPace, GhostProjector, GhostTracker, Indicator, DEFAULT_GHOST_CPS};
use crate::protocol::{ScoreEntry, ScoreSubmission};
use crate::ranking::{placement, HighscoreQuery};
use crate::schedule::Scheduler;
use crate::typing::{CharMark, TypingEngine, TypingEvent};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaceConfig {
    pub duration_seconds: u32,
    pub default_ghost_cps: f64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            duration_seconds: DEFAULT_RACE_SECONDS,
            default_ghost_cps: DEFAULT_GHOST_CPS,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub name: String,
    pub email: String,
}

/// Final numbers of a race as computed on the client.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaceResult {
    pub chars_typed: u64,
    pub elapsed_ms: u64,
    pub cps: f64,
}

impl RaceResult {
    pub fn new(chars_typed: u64, elapsed_ms: u64) -> Self {
        Self {
            chars_typed,
            elapsed_ms,
            cps: race_cps(chars_typed, elapsed_ms),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }
}

/// Something the view or the audio layer should react to, in the order it
/// happened.
#[derive(Clone, Debug, PartialEq)]
pub enum RaceSignal {
    Progress(f64),
    Started,
    Tick(u32),
    Beep(u32),
    /// The race is over; submit this (fire-and-forget).
    Ended(ScoreSubmission),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RaceInputOutcome {
    pub accepted: bool,
    pub value: String,
    pub signals: Vec<RaceSignal>,
}

/// Shared flag telling in-flight requests whether their race still exists.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Liveness(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Leaderboard both sides of the race talk to.
#[allow(async_fn_in_trait)]
pub trait ScoreApi {
    type Error: std::fmt::Display;

    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<ScoreEntry, Self::Error>;

    async fn highscores(&self, query: &HighscoreQuery) -> Result<Vec<ScoreEntry>, Self::Error>;

    /// Best entry of the event, `Ok(None)` when there is none yet.
    async fn top_score(&self) -> Result<Option<ScoreEntry>, Self::Error>;
}

/// Leaderboard snapshot fetched after a race, with the local placement.
#[derive(Clone, Debug, PartialEq)]
pub struct Settlement {
    pub leaderboard: Vec<ScoreEntry>,
    pub placement: Option<usize>,
}

/// Submit the score, then fetch the leaderboard and place the result.
///
/// Submission failures are logged and forgotten. A failed fetch leaves
/// the placement unavailable. Returns `None` when the race was torn down
/// while a request was in flight.
pub async fn settle<A: ScoreApi>(
    api: &A,
    submission: &ScoreSubmission,
    cps: f64,
    liveness: &Liveness,
) -> Option<Settlement> {
    if let Err(err) = api.submit_score(submission).await {
        warn!(error = %err, "score submission failed");
    }
    if !liveness.is_alive() {
        return None;
    }
    let fetched = api.highscores(&HighscoreQuery::default()).await;
    if !liveness.is_alive() {
        return None;
    }
    Some(match fetched {
        Ok(leaderboard) => Settlement {
            placement: placement(&leaderboard, &submission.name, cps),
            leaderboard,
        },
        Err(err) => {
            warn!(error = %err, "leaderboard fetch failed");
            Settlement {
                leaderboard: Vec::new(),
                placement: None,
            }
        }
    })
}

/// Ghost pace for the event: the leader, the default pace on an empty
/// board, nothing when the leader cannot be fetched.
pub fn ghost_pace<E: std::fmt::Display>(top: Result<Option<ScoreEntry>, E>) -> GhostPace {
    match top {
        Ok(Some(entry)) => GhostPace::Leader(entry.cps),
        Ok(None) => GhostPace::Default,
        Err(err) => {
            warn!(error = %err, "leader fetch failed");
            GhostPace::Unavailable
        }
    }
}

/// Everything the race screen renders.
#[derive(Clone, Debug, PartialEq)]
pub struct RaceView {
    pub state: RaceState,
    pub progress: f64,
    pub seconds_left: u32,
    pub lines: [String; 2],
    pub active_word: usize,
    pub marks: Vec<(char, CharMark)>,
    pub ghost: Option<f64>,
    pub indicator: Option<Indicator>,
    pub result: Option<RaceResult>,
    /// The post-race leaderboard has been applied.
    pub settled: bool,
    pub placement: Option<usize>,
    pub leaderboard: Vec<ScoreEntry>,
}

impl Default for RaceView {
    fn default() -> Self {
        Self {
            state: RaceState::Idle,
            progress: 0.0,
            seconds_left: DEFAULT_RACE_SECONDS,
            lines: [String::new(), String::new()],
            active_word: 0,
            marks: Vec::new(),
            ghost: None,
            indicator: None,
            result: None,
            settled: false,
            placement: None,
            leaderboard: Vec::new(),
        }
    }
}

pub struct RaceOrchestrator {
    player: PlayerIdentity,
    config: RaceConfig,
    state: RaceState,
    engine: TypingEngine,
    clock: RaceClock,
    tracker: GhostTracker,
    ghost: Option<GhostProjector>,
    progress: f64,
    seconds_left: u32,
    started_at_ms: Option<u64>,
    result: Option<RaceResult>,
    settled: bool,
    placement: Option<usize>,
    leaderboard: Vec<ScoreEntry>,
    liveness: Liveness,
}

impl RaceOrchestrator {
    pub fn new(player: PlayerIdentity, text: &str, config: RaceConfig) -> Self {
        Self {
            player,
            config,
            state: RaceState::default(),
            engine: TypingEngine::new(text),
            clock: RaceClock::new(config.duration_seconds),
            tracker: GhostTracker::new(config.duration_seconds),
            ghost: None,
            progress: 0.0,
            seconds_left: config.duration_seconds,
            started_at_ms: None,
            result: None,
            settled: false,
            placement: None,
            leaderboard: Vec::new(),
            liveness: Liveness::new(),
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn player(&self) -> &PlayerIdentity {
        &self.player
    }

    pub fn engine(&self) -> &TypingEngine {
        &self.engine
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn result(&self) -> Option<RaceResult> {
        self.result
    }

    pub fn placement(&self) -> Option<usize> {
        self.placement
    }

    pub fn leaderboard(&self) -> &[ScoreEntry] {
        &self.leaderboard
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Install the ghost's pace once the leader is known.
    pub fn apply_ghost_pace(&mut self, pace: GhostPace) {
        if self.state == RaceState::TornDown {
            return;
        }
        let cps = match pace {
            GhostPace::Default => Some(self.config.default_ghost_cps),
            other => other.cps(),
        };
        self.ghost = cps.map(|cps| GhostProjector::new(cps, self.engine.text().total_chars()));
    }

    pub fn ghost_ratio(&self) -> Option<f64> {
        self.ghost
            .map(|ghost| ghost.position(self.tracker.elapsed_secs()))
    }

    pub fn ahead_behind(&self) -> Option<Indicator> {
        self.ghost_ratio().map(|ghost| {
            Indicator::between(self.progress, ghost, self.engine.text().total_chars())
        })
    }

    /// Feed the text box's current value.
    pub fn input(&mut self, scheduler: &mut dyn Scheduler, value: &str) -> RaceInputOutcome {
        if matches!(self.state, RaceState::Ended | RaceState::TornDown) {
            return RaceInputOutcome {
                accepted: false,
                value: self.engine.value().to_string(),
                signals: Vec::new(),
            };
        }
        let outcome = self.engine.apply_input_value(value);
        let mut signals = Vec::new();
        for event in outcome.events {
            match event {
                TypingEvent::Progress(ratio) => {
                    self.progress = ratio;
                    signals.push(RaceSignal::Progress(ratio));
                    if ratio > 0.0 && self.state == RaceState::Idle {
                        self.begin(scheduler, &mut signals);
                    }
                }
                TypingEvent::Complete => {
                    self.end(scheduler, RaceEvent::TextCompleted, &mut signals);
                }
            }
        }
        RaceInputOutcome {
            accepted: outcome.accepted,
            value: outcome.value,
            signals,
        }
    }

    /// Route a fired interval to the countdown.
    pub fn interval(&mut self, scheduler: &mut dyn Scheduler) -> Vec<RaceSignal> {
        let mut signals = Vec::new();
        let clock_signals = self.clock.on_interval(scheduler);
        self.absorb_clock(scheduler, clock_signals, &mut signals);
        signals
    }

    /// Route an animation frame to the ghost.
    pub fn frame(&mut self, scheduler: &mut dyn Scheduler) {
        self.tracker.on_frame(scheduler);
    }

    /// Leave the race screen. Pending timers are cancelled and in-flight
    /// requests will be ignored.
    pub fn teardown(&mut self, scheduler: &mut dyn Scheduler) {
        if !self.consume(RaceEvent::Teardown) {
            return;
        }
        self.clock.cancel(scheduler);
        self.tracker.cancel(scheduler);
        self.liveness.revoke();
        debug!(player = %self.player.name, "race torn down");
    }

    /// Store the post-race leaderboard unless the race is gone.
    pub fn apply_settlement(&mut self, settlement: Settlement) {
        if self.state != RaceState::Ended || !self.liveness.is_alive() {
            return;
        }
        self.leaderboard = settlement.leaderboard;
        self.placement = settlement.placement;
        self.settled = true;
    }

    /// Submit and settle in one step; the result is applied only if the race
    /// is still on screen.
    pub fn settle_with<'a, A: ScoreApi>(
        &self,
        api: &'a A,
        submission: ScoreSubmission,
    ) -> impl Future<Output = Option<Settlement>> + 'a {
        let liveness = self.liveness();
        let cps = self.result.map(|r| r.cps).unwrap_or(0.0);
        async move { settle(api, &submission, cps, &liveness).await }
    }

    pub fn snapshot(&self) -> RaceView {
        let [current, next] = self.engine.visible_lines();
        RaceView {
            state: self.state,
            progress: self.progress,
            seconds_left: self.seconds_left,
            lines: [current.to_string(), next.to_string()],
            active_word: self.engine.cursor().word_index,
            marks: self.engine.word_marks(),
            ghost: self.ghost_ratio(),
            indicator: self.ahead_behind(),
            result: self.result,
            settled: self.settled,
            placement: self.placement,
            leaderboard: self.leaderboard.clone(),
        }
    }

    fn begin(&mut self, scheduler: &mut dyn Scheduler, signals: &mut Vec<RaceSignal>) {
        if !self.consume(RaceEvent::FirstProgress) {
            return;
        }
        let now = scheduler.now_ms();
        self.started_at_ms.get_or_insert(now);
        signals.push(RaceSignal::Started);
        info!(player = %self.player.name, "race started");

        let clock_signals = self.clock.start(scheduler);
        self.absorb_clock(scheduler, clock_signals, signals);
        if self.state == RaceState::Running {
            self.tracker.resume(scheduler, now);
        }
    }

    fn absorb_clock(
        &mut self,
        scheduler: &mut dyn Scheduler,
        clock_signals: Vec<ClockSignal>,
        signals: &mut Vec<RaceSignal>,
    ) {
        for signal in clock_signals {
            match signal {
                ClockSignal::Tick(left) => {
                    self.seconds_left = left;
                    self.tracker.sync_coarse(self.clock.elapsed_seconds());
                    signals.push(RaceSignal::Tick(left));
                }
                ClockSignal::Beep(hz) => signals.push(RaceSignal::Beep(hz)),
                ClockSignal::End => self.end(scheduler, RaceEvent::ClockExpired, signals),
            }
        }
    }

    fn end(&mut self, scheduler: &mut dyn Scheduler, cause: RaceEvent, signals: &mut Vec<RaceSignal>) {
        if !self.consume(cause) {
            return;
        }
        if cause == RaceEvent::TextCompleted {
            self.progress = 1.0;
        }
        let total = self.engine.text().total_chars() as f64;
        let chars_typed = (self.progress * total).round().max(0.0) as u64;
        let elapsed_ms = match self.started_at_ms {
            Some(start) => scheduler.now_ms().saturating_sub(start),
            None => u64::from(self.clock.elapsed_seconds()) * 1000,
        };
        let result = RaceResult::new(chars_typed, elapsed_ms);
        self.result = Some(result);

        self.clock.cancel(scheduler);
        self.tracker.freeze(scheduler, self.clock.elapsed_seconds());
        info!(
            player = %self.player.name,
            chars = result.chars_typed,
            elapsed_ms = result.elapsed_ms,
            cps = result.cps,
            cause = ?cause,
            "race ended"
        );

        let email = Some(self.player.email.trim())
            .filter(|email| !email.is_empty())
            .map(str::to_string);
        signals.push(RaceSignal::Ended(ScoreSubmission {
            name: self.player.name.clone(),
            email,
            chars_typed,
            duration_ms: Some(elapsed_ms.max(1)),
            duration_seconds: None,
            accuracy: None,
        }));
    }

    fn consume(&mut self, event: RaceEvent) -> bool {
        match RaceState::transition(&self.state, &event) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ManualScheduler;
    use chrono::Utc;
    use futures::executor::block_on;
    use std::cell::RefCell;

    const TEXT: &str = "lorem ipsum\ndolor";

    fn player() -> PlayerIdentity {
        PlayerIdentity {
            name: "Alice".into(),
            email: "alice@example.com".into(),
        }
    }

    fn race(text: &str) -> RaceOrchestrator {
        RaceOrchestrator::new(player(), text, RaceConfig::default())
    }

    fn type_str(
        race: &mut RaceOrchestrator,
        sched: &mut ManualScheduler,
        input: &str,
    ) -> Vec<RaceSignal> {
        let mut signals = Vec::new();
        for c in input.chars() {
            let next = format!("{}{}", race.engine().value(), c);
            signals.extend(race.input(sched, &next).signals);
        }
        signals
    }

    fn advance(race: &mut RaceOrchestrator, sched: &mut ManualScheduler, ms: u64) -> Vec<RaceSignal> {
        let mut signals = Vec::new();
        sched.advance(ms, |s, _| signals.extend(race.interval(s)));
        signals
    }

    fn submissions(signals: &[RaceSignal]) -> Vec<&ScoreSubmission> {
        signals
            .iter()
            .filter_map(|s| match s {
                RaceSignal::Ended(sub) => Some(sub),
                _ => None,
            })
            .collect()
    }

    fn score(name: &str, cps: f64) -> ScoreEntry {
        ScoreEntry {
            id: name.to_string(),
            name: name.to_string(),
            email: None,
            cps,
            chars_typed: 0,
            duration_seconds: 60,
            duration_ms: 60_000,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }

    #[derive(Default)]
    struct FakeApi {
        board: Vec<ScoreEntry>,
        fail_submit: bool,
        fail_fetch: bool,
        submitted: RefCell<Vec<ScoreSubmission>>,
        on_submit: Option<Liveness>,
    }

    impl ScoreApi for FakeApi {
        type Error = String;

        async fn submit_score(&self, submission: &ScoreSubmission) -> Result<ScoreEntry, String> {
            self.submitted.borrow_mut().push(submission.clone());
            if let Some(liveness) = &self.on_submit {
                liveness.revoke();
            }
            if self.fail_submit {
                return Err("offline".into());
            }
            Ok(score(&submission.name, 0.0))
        }

        async fn highscores(&self, _query: &HighscoreQuery) -> Result<Vec<ScoreEntry>, String> {
            if self.fail_fetch {
                return Err("offline".into());
            }
            Ok(self.board.clone())
        }

        async fn top_score(&self) -> Result<Option<ScoreEntry>, String> {
            Ok(self.board.first().cloned())
        }
    }

    #[test]
    fn test_first_progress_starts_race_and_clock() {
        let mut sched = ManualScheduler::new(5_000);
        let mut race = race(TEXT);
        assert_eq!(race.state(), RaceState::Idle);

        let wrong = type_str(&mut race, &mut sched, "x");
        assert!(wrong.is_empty());
        assert_eq!(race.state(), RaceState::Idle);
        race.input(&mut sched, "");

        let signals = type_str(&mut race, &mut sched, "l");
        assert_eq!(race.state(), RaceState::Running);
        assert!(matches!(signals[0], RaceSignal::Progress(_)));
        assert_eq!(signals[1], RaceSignal::Started);
        assert_eq!(signals[2], RaceSignal::Tick(60));
        assert_eq!(sched.active_intervals(), 1);
        assert_eq!(sched.pending_frames(), 1);

        // later progress does not restart anything
        let more = type_str(&mut race, &mut sched, "o");
        assert!(!more.contains(&RaceSignal::Started));
        assert_eq!(sched.active_intervals(), 1);
    }

    #[test]
    fn test_completion_ends_race_with_wall_clock_cps() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race(TEXT);
        type_str(&mut race, &mut sched, "l");
        advance(&mut race, &mut sched, 2_500);
        let signals = type_str(&mut race, &mut sched, "orem ipsum dolor ");

        let subs = submissions(&signals);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].chars_typed, 16);
        assert_eq!(subs[0].duration_ms, Some(2_500));
        assert_eq!(subs[0].email.as_deref(), Some("alice@example.com"));

        let result = race.result().unwrap();
        assert_eq!(result.elapsed_ms, 2_500);
        assert!((result.cps - 16.0 / 2.5).abs() < 1e-9);
        assert_eq!(race.state(), RaceState::Ended);
        assert_eq!(sched.active_intervals(), 0);
        assert_eq!(sched.pending_frames(), 0);

        // the clock can no longer end the race a second time
        assert!(advance(&mut race, &mut sched, 120_000).is_empty());
    }

    #[test]
    fn test_clock_expiry_ends_race_with_partial_progress() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race(TEXT);
        type_str(&mut race, &mut sched, "lorem");
        let signals = advance(&mut race, &mut sched, 60_000);

        let beeps: Vec<u32> = signals
            .iter()
            .filter_map(|s| match s {
                RaceSignal::Beep(hz) => Some(*hz),
                _ => None,
            })
            .collect();
        assert_eq!(beeps, vec![440, 440, 440, 880]);
        let subs = submissions(&signals);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].chars_typed, 5);
        assert_eq!(subs[0].duration_ms, Some(60_000));
        assert_eq!(race.seconds_left(), 0);

        let after = type_str(&mut race, &mut sched, " ");
        assert!(after.is_empty());
    }

    #[test]
    fn test_ghost_follows_frames_and_freezes_at_end() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race(TEXT);
        race.apply_ghost_pace(GhostPace::Leader(1.0));
        assert_eq!(race.ghost_ratio(), Some(0.0));

        type_str(&mut race, &mut sched, "l");
        sched.advance_frame(1_600, |s, _| race.frame(s));
        let ghost = race.ghost_ratio().unwrap();
        assert!((ghost - 1.6 / 16.0).abs() < 1e-9);
        // player 1/16, ghost 1.6/16 → behind by 0.6 → -1 after rounding
        assert_eq!(race.ahead_behind(), Some(Indicator(-1)));

        advance(&mut race, &mut sched, 60_000);
        assert_eq!(race.state(), RaceState::Ended);
        assert_eq!(race.ghost_ratio(), Some(1.0));
        assert_eq!(sched.pending_frames(), 0);
    }

    #[test]
    fn test_default_and_missing_ghost() {
        let mut race = race(TEXT);
        race.apply_ghost_pace(GhostPace::Default);
        assert!(race.ghost_ratio().is_some());
        race.apply_ghost_pace(GhostPace::Unavailable);
        assert_eq!(race.ghost_ratio(), None);
        assert_eq!(race.ahead_behind(), None);
    }

    #[test]
    fn test_ghost_pace_from_top_fetch() {
        assert_eq!(ghost_pace::<String>(Ok(Some(score("t", 6.0)))), GhostPace::Leader(6.0));
        assert_eq!(ghost_pace::<String>(Ok(None)), GhostPace::Default);
        assert_eq!(ghost_pace(Err("boom")), GhostPace::Unavailable);
    }

    #[test]
    fn test_teardown_cancels_timers_and_ignores_late_results() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race(TEXT);
        type_str(&mut race, &mut sched, "lo");
        race.teardown(&mut sched);
        assert_eq!(race.state(), RaceState::TornDown);
        assert_eq!(sched.active_intervals(), 0);
        assert_eq!(sched.pending_frames(), 0);
        assert!(!race.liveness().is_alive());

        race.apply_settlement(Settlement {
            leaderboard: vec![score("x", 1.0)],
            placement: Some(1),
        });
        assert!(race.leaderboard().is_empty());
        assert_eq!(race.placement(), None);
        assert!(!race.input(&mut sched, "lor").accepted);
    }

    #[test]
    fn test_settle_places_result_in_snapshot() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race("ab");
        type_str(&mut race, &mut sched, "a");
        sched.advance(1_000, |_, _| {});
        let signals = type_str(&mut race, &mut sched, "b ");
        let submission = submissions(&signals)[0].clone();

        let api = FakeApi {
            board: vec![score("Top", 6.0), score("Slow", 1.0)],
            ..FakeApi::default()
        };
        let settlement = block_on(race.settle_with(&api, submission)).unwrap();
        assert_eq!(api.submitted.borrow().len(), 1);
        assert_eq!(settlement.placement, Some(2));
        assert!(!race.snapshot().settled);
        race.apply_settlement(settlement);
        assert!(race.snapshot().settled);
        assert_eq!(race.placement(), Some(2));
        assert_eq!(race.leaderboard().len(), 2);
    }

    #[test]
    fn test_settle_degrades_on_network_failure() {
        let submission = ScoreSubmission {
            name: "Alice".into(),
            email: None,
            chars_typed: 10,
            duration_ms: Some(1_000),
            duration_seconds: None,
            accuracy: None,
        };
        let api = FakeApi {
            fail_submit: true,
            fail_fetch: true,
            ..FakeApi::default()
        };
        let settlement = block_on(settle(&api, &submission, 10.0, &Liveness::new())).unwrap();
        assert_eq!(settlement.placement, None);
        assert!(settlement.leaderboard.is_empty());

        let api = FakeApi {
            fail_submit: true,
            ..FakeApi::default()
        };
        let settlement = block_on(settle(&api, &submission, 10.0, &Liveness::new())).unwrap();
        assert_eq!(settlement.placement, Some(1));
    }

    #[test]
    fn test_settle_stops_when_race_is_gone() {
        let submission = ScoreSubmission {
            name: "Alice".into(),
            email: None,
            chars_typed: 1,
            duration_ms: Some(1),
            duration_seconds: None,
            accuracy: None,
        };
        let liveness = Liveness::new();
        let api = FakeApi {
            on_submit: Some(liveness.clone()),
            ..FakeApi::default()
        };
        assert_eq!(block_on(settle(&api, &submission, 1.0, &liveness)), None);
    }

    #[test]
    fn test_empty_text_completes_without_start() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race("");
        let outcome = race.input(&mut sched, " ");
        assert!(outcome.accepted);
        let subs = submissions(&outcome.signals);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].chars_typed, 0);
        assert_eq!(subs[0].duration_ms, Some(1));
        assert_eq!(race.state(), RaceState::Ended);
    }

    #[test]
    fn test_view_reflects_cursor() {
        let mut sched = ManualScheduler::new(0);
        let mut race = race(TEXT);
        type_str(&mut race, &mut sched, "lorem ip");
        let view = race.snapshot();
        assert_eq!(view.lines, ["lorem ipsum".to_string(), "dolor".to_string()]);
        assert_eq!(view.active_word, 1);
        assert_eq!(view.marks[0], ('i', CharMark::Correct));
        assert_eq!(view.marks[2], ('s', CharMark::Pending));
        assert_eq!(view.state, RaceState::Running);
    }
}
