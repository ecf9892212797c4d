pub mod clock;
pub mod cps;
pub mod fsm;
pub mod ghost;
pub mod passages;
pub mod protocol;
pub mod race;
pub mod ranking;
pub mod schedule;
pub mod text;
pub mod typing;
