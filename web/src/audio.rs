use std::cell::RefCell;

use wasm_bindgen::JsValue;
use web_sys::{AudioContext, OscillatorType};

const BEEP_SECONDS: f64 = 0.12;

thread_local! {
    static CONTEXT: RefCell<Option<AudioContext>> = const { RefCell::new(None) };
}

/// Short sine beep at `hz`. Browsers without Web Audio stay silent.
pub fn beep(hz: u32) {
    if let Err(err) = CONTEXT.with(|cell| try_beep(&mut cell.borrow_mut(), hz)) {
        web_sys::console::warn_2(&"beep failed".into(), &err);
    }
}

fn try_beep(slot: &mut Option<AudioContext>, hz: u32) -> Result<(), JsValue> {
    let ctx = match slot {
        Some(ctx) => ctx,
        None => slot.insert(AudioContext::new()?),
    };
    let oscillator = ctx.create_oscillator()?;
    let gain = ctx.create_gain()?;
    oscillator.set_type(OscillatorType::Sine);
    oscillator.frequency().set_value(hz as f32);
    gain.gain().set_value(0.2);
    oscillator.connect_with_audio_node(&gain)?;
    gain.connect_with_audio_node(&ctx.destination())?;

    let now = ctx.current_time();
    oscillator.start_with_when(now)?;
    oscillator.stop_with_when(now + BEEP_SECONDS)?;
    Ok(())
}
