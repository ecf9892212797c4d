use std::collections::HashMap;
use std::time::Duration;

use gloo_timers::callback::Interval;
use shared::schedule::{FrameId, Scheduler, TimerId};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::session;

/// Browser timers: `gloo-timers` intervals and `requestAnimationFrame`.
/// Every fire is routed back through [`session`], never into a captured
/// race.
#[derive(Default)]
pub struct BrowserScheduler {
    next_id: u64,
    intervals: HashMap<TimerId, Interval>,
    frames: HashMap<FrameId, i32>,
}

impl BrowserScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Forget a delivered frame; false if it was cancelled meanwhile.
    pub fn take_frame(&mut self, id: FrameId) -> bool {
        self.frames.remove(&id).is_some()
    }

    pub fn owns_interval(&self, id: TimerId) -> bool {
        self.intervals.contains_key(&id)
    }

    pub fn cancel_all(&mut self) {
        let timers: Vec<TimerId> = self.intervals.keys().copied().collect();
        for id in timers {
            self.cancel_interval(id);
        }
        let frames: Vec<FrameId> = self.frames.keys().copied().collect();
        for id in frames {
            self.cancel_frame(id);
        }
    }
}

impl Scheduler for BrowserScheduler {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        let id = TimerId(self.allocate());
        let millis = u32::try_from(period.as_millis()).unwrap_or(u32::MAX);
        let interval = Interval::new(millis, move || session::on_interval(id));
        self.intervals.insert(id, interval);
        id
    }

    fn cancel_interval(&mut self, id: TimerId) {
        if let Some(interval) = self.intervals.remove(&id) {
            // the cancel may come from inside this very callback; drop the
            // closure once the current task is done
            let closure = interval.cancel();
            wasm_bindgen_futures::spawn_local(async move { drop(closure) });
        }
    }

    fn request_frame(&mut self) -> FrameId {
        let id = FrameId(self.allocate());
        let callback = Closure::once_into_js(move || session::on_frame(id));
        let handle = web_sys::window()
            .and_then(|w| w.request_animation_frame(callback.unchecked_ref()).ok());
        match handle {
            Some(handle) => {
                self.frames.insert(id, handle);
            }
            None => web_sys::console::warn_1(&"requestAnimationFrame unavailable".into()),
        }
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if let Some(handle) = self.frames.remove(&id) {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(handle);
            }
        }
    }
}
