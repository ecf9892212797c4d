//! The race on screen, held outside the component tree.
//!
//! Leptos children closures must be `Send + Sync`, while the orchestrator and
//! browser timers are neither, so the running race lives in thread-local
//! storage and every handler, timer fire and response goes through here.

use std::cell::{Cell, RefCell};

use leptos::prelude::*;
use shared::race::{
    ghost_pace, settle, PlayerIdentity, RaceConfig, RaceOrchestrator, RaceSignal, RaceView,
    ScoreApi,
};
use shared::schedule::{FrameId, TimerId};
use wasm_bindgen_futures::spawn_local;

use crate::api::ApiClient;
use crate::audio;
use crate::scheduler::BrowserScheduler;

struct Session {
    id: u64,
    race: RaceOrchestrator,
    scheduler: BrowserScheduler,
    view: WriteSignal<RaceView>,
    api: Option<ApiClient>,
}

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

/// What a step produced, applied once the session borrow is released.
struct Effects {
    signals: Vec<RaceSignal>,
    view: WriteSignal<RaceView>,
    snapshot: RaceView,
}

fn step(f: impl FnOnce(&mut RaceOrchestrator, &mut BrowserScheduler) -> Vec<RaceSignal>) -> Option<Effects> {
    SESSION.with(|cell| {
        let mut guard = cell.borrow_mut();
        let session = guard.as_mut()?;
        let signals = f(&mut session.race, &mut session.scheduler);
        Some(Effects {
            signals,
            view: session.view,
            snapshot: session.race.snapshot(),
        })
    })
}

fn apply(effects: Option<Effects>) {
    let Some(effects) = effects else {
        return;
    };
    effects.view.set(effects.snapshot);
    for signal in effects.signals {
        match signal {
            RaceSignal::Beep(hz) => audio::beep(hz),
            RaceSignal::Ended(submission) => submit(submission),
            RaceSignal::Started | RaceSignal::Progress(_) | RaceSignal::Tick(_) => {}
        }
    }
}

/// Build a fresh race, replacing any previous one. Returns the id to pass
/// to [`end`].
pub fn begin(player: PlayerIdentity, text: &str, view: WriteSignal<RaceView>) -> u64 {
    teardown();
    let id = NEXT_ID.with(|next| {
        next.set(next.get() + 1);
        next.get()
    });
    let api = match ApiClient::from_location() {
        Ok(api) => Some(api),
        Err(err) => {
            web_sys::console::error_1(&err.to_string().into());
            None
        }
    };
    let race = RaceOrchestrator::new(player, text, RaceConfig::default());
    let liveness = race.liveness();
    view.set(race.snapshot());
    SESSION.with(|cell| {
        *cell.borrow_mut() = Some(Session {
            id,
            race,
            scheduler: BrowserScheduler::new(),
            view,
            api: api.clone(),
        });
    });

    let Some(api) = api else {
        return id;
    };
    spawn_local(async move {
        let pace = ghost_pace(api.top_score().await);
        if !liveness.is_alive() {
            return;
        }
        apply(step(|race, _| {
            race.apply_ghost_pace(pace);
            Vec::new()
        }));
    });
    id
}

/// Feed the text box value; returns the value the box must show.
pub fn input(value: &str) -> Option<String> {
    let mut outcome_value = None;
    let effects = step(|race, scheduler| {
        let outcome = race.input(scheduler, value);
        outcome_value = Some(outcome.value);
        outcome.signals
    });
    apply(effects);
    outcome_value
}

pub fn on_interval(id: TimerId) {
    apply(step(|race, scheduler| {
        if !scheduler.owns_interval(id) {
            return Vec::new();
        }
        race.interval(scheduler)
    }));
}

pub fn on_frame(id: FrameId) {
    apply(step(|race, scheduler| {
        if scheduler.take_frame(id) {
            race.frame(scheduler);
        }
        Vec::new()
    }));
}

/// Leave race `id` unless another race already replaced it.
pub fn end(id: u64) {
    let current = SESSION.with(|cell| cell.borrow().as_ref().map(|s| s.id));
    if current == Some(id) {
        teardown();
    }
}

/// Leave the race screen: timers stop now, late responses are ignored.
pub fn teardown() {
    let previous = SESSION.with(|cell| cell.borrow_mut().take());
    if let Some(mut session) = previous {
        session.race.teardown(&mut session.scheduler);
        session.scheduler.cancel_all();
    }
}

fn submit(submission: shared::protocol::ScoreSubmission) {
    let context = SESSION.with(|cell| {
        cell.borrow()
            .as_ref()
            .and_then(|s| s.api.clone().map(|api| (api, s.race.liveness(), s.race.result())))
    });
    let Some((api, liveness, result)) = context else {
        return;
    };
    let cps = result.map(|r| r.cps).unwrap_or(0.0);
    spawn_local(async move {
        let Some(settlement) = settle(&api, &submission, cps, &liveness).await else {
            return;
        };
        apply(step(|race, _| {
            race.apply_settlement(settlement);
            Vec::new()
        }));
    });
}
