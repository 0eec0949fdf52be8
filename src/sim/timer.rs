//! Phase timers
//!
//! Timers are owned slots on a millisecond clock supplied by the caller.
//! Arming a slot cancels whatever it held, so at most one timer per slot is
//! ever live and a replaced timer can never fire.

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::RngState;
use crate::settings::PhaseTiming;

/// Identifies one arming of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug, Clone, Copy)]
struct Armed<K> {
    token: TimerToken,
    kind: K,
    due_at: u64,
}

/// A single cancel-and-replace timer
#[derive(Debug, Clone)]
pub struct TimerSlot<K> {
    next_token: u64,
    armed: Option<Armed<K>>,
}

impl<K> Default for TimerSlot<K> {
    fn default() -> Self {
        Self {
            next_token: 1,
            armed: None,
        }
    }
}

impl<K: Copy> TimerSlot<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot, invalidating any previous timer
    pub fn arm(&mut self, kind: K, due_at: u64) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.armed = Some(Armed {
            token,
            kind,
            due_at,
        });
        token
    }

    /// Cancel the live timer, returning what it would have fired
    pub fn cancel(&mut self) -> Option<K> {
        self.armed.take().map(|a| a.kind)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Whether `token` still names the live timer
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.armed.is_some_and(|a| a.token == token)
    }

    /// Kind and due time of the live timer
    pub fn pending(&self) -> Option<(K, u64)> {
        self.armed.map(|a| (a.kind, a.due_at))
    }

    /// Disarm and return the timer if it is due at `now`
    pub fn take_due(&mut self, now: u64) -> Option<(K, u64)> {
        match self.armed {
            Some(a) if now >= a.due_at => {
                self.armed = None;
                Some((a.kind, a.due_at))
            }
            _ => None,
        }
    }
}

/// What a phase timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTimer {
    /// Count down one step
    CountdownStep,
    /// "GO!" has been shown, start the first round
    CountdownGo,
    /// Green light is over
    GreenExpired,
    /// Red light survived
    RedExpired,
    /// Pause after a survived red light is over
    NextRound,
    /// Caught grace period is over
    CaughtRecovered,
}

/// Randomized phase durations
#[derive(Debug, Clone)]
pub struct RoundTimer {
    rng: Pcg32,
    timing: PhaseTiming,
}

impl RoundTimer {
    pub fn new(seed: u64, timing: PhaseTiming) -> Self {
        Self {
            rng: RngState::new(seed, RngState::TIMER_STREAM).to_rng(),
            timing,
        }
    }

    pub fn timing(&self) -> &PhaseTiming {
        &self.timing
    }

    /// Duration of the next green light
    pub fn green_duration(&mut self) -> u64 {
        self.rng.random_range(self.timing.green_range())
    }

    /// Duration of the next red light
    pub fn red_duration(&mut self) -> u64 {
        self.rng.random_range(self.timing.red_range())
    }

    /// Delay before `timer` fires when armed from its phase
    pub fn delay_for(&mut self, timer: PhaseTimer) -> u64 {
        match timer {
            PhaseTimer::CountdownStep => self.timing.countdown_step_ms,
            PhaseTimer::CountdownGo => self.timing.countdown_go_ms,
            PhaseTimer::GreenExpired => self.green_duration(),
            PhaseTimer::RedExpired => self.red_duration(),
            PhaseTimer::NextRound => self.timing.survive_pause_ms,
            PhaseTimer::CaughtRecovered => self.timing.caught_grace_ms,
        }
    }
}
