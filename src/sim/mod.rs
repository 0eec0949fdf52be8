//! Deterministic game core
//!
//! All gameplay rules live here. This module must stay pure and deterministic:
//! - Time is a millisecond clock passed in by the caller
//! - Seeded RNG only
//! - No camera, classifier or rendering dependencies

pub mod machine;
pub mod state;
pub mod timer;

pub use machine::{Capture, GameMachine};
pub use state::{GameEvent, GameState, RngState, Stats, StatsPatch};
pub use timer::{PhaseTimer, RoundTimer, TimerSlot, TimerToken};
