/// Floor on the elapsed time of a finished race, so an instant finish does
/// not divide by zero.
pub const MIN_ELAPSED_SECONDS: f64 = 0.1;

/// Characters per second as shown to the player at the end of a race.
pub fn race_cps(chars: u64, elapsed_ms: u64) -> f64 {
    chars as f64 / (elapsed_ms as f64 / 1000.0).max(MIN_ELAPSED_SECONDS)
}

/// Characters per second recorded by the server for a submission.
/// `duration_ms` has already been validated as positive.
pub fn submitted_cps(chars: u64, duration_ms: u64) -> f64 {
    chars as f64 / (duration_ms as f64 / 1000.0)
}

/// Whole seconds stored next to the precise duration, never below one.
pub fn duration_seconds(duration_ms: u64) -> u64 {
    ((duration_ms as f64 / 1000.0).round() as u64).max(1)
}
