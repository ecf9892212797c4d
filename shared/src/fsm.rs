use rust_fsm::*;

/// Lifecycle of one race screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceState {
    Idle,
    Running,
    Ended,
    TornDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceEvent {
    FirstProgress,
    TextCompleted,
    ClockExpired,
    Teardown,
}

impl StateMachineImpl for RaceState {
    type Input = RaceEvent;
    type State = RaceState;
    type Output = ();
    const INITIAL_STATE: Self::State = RaceState::Idle;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        match (state, input) {
            (RaceState::Idle, RaceEvent::FirstProgress) => Some(RaceState::Running),
            // an empty text completes before any progress is reported
            (RaceState::Idle, RaceEvent::TextCompleted) => Some(RaceState::Ended),
            (RaceState::Running, RaceEvent::TextCompleted) => Some(RaceState::Ended),
            (RaceState::Running, RaceEvent::ClockExpired) => Some(RaceState::Ended),
            (RaceState::TornDown, RaceEvent::Teardown) => None,
            (_, RaceEvent::Teardown) => Some(RaceState::TornDown),
            _ => None,
        }
    }

    fn output(_state: &Self::State, _input: &Self::Input) -> Option<Self::Output> {
        None
    }
}

impl Default for RaceState {
    fn default() -> Self {
        RaceState::INITIAL_STATE
    }
}

/// Start latch of the countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEvent {
    Start,
    Expire,
    Cancel,
}

impl StateMachineImpl for ClockState {
    type Input = ClockEvent;
    type State = ClockState;
    type Output = ();
    const INITIAL_STATE: Self::State = ClockState::Idle;

    fn transition(state: &Self::State, input: &Self::Input) -> Option<Self::State> {
        match (state, input) {
            (ClockState::Idle, ClockEvent::Start) => Some(ClockState::Running),
            (ClockState::Running, ClockEvent::Expire) => Some(ClockState::Ended),
            (ClockState::Idle | ClockState::Running, ClockEvent::Cancel) => Some(ClockState::Ended),
            _ => None,
        }
    }

    fn output(_state: &Self::State, _input: &Self::Input) -> Option<Self::Output> {
        None
    }
}

impl Default for ClockState {
    fn default() -> Self {
        ClockState::INITIAL_STATE
    }
}
