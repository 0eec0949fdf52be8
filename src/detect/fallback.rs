//! Synthetic movement signal used when no classifier is available
//!
//! Produces bursty "movement episodes" instead of per-frame noise: a random
//! moving/still state is held for a few seconds, and samples are drawn around
//! that state.

use rand::Rng;
use rand_pcg::Pcg32;

use crate::sim::RngState;

/// Chance threshold for the very first episode to be a moving one
const FIRST_MOVING_THRESHOLD: f32 = 0.7;
/// Chance threshold for later episodes
const NEXT_MOVING_THRESHOLD: f32 = 0.6;
/// First episode length (ms)
const FIRST_EPISODE_MS: std::ops::Range<u64> = 1000..4000;
/// Later episode length (ms)
const NEXT_EPISODE_MS: std::ops::Range<u64> = 2000..6000;
const NOISE: f32 = 0.05;

/// Current movement episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackMovementState {
    pub is_moving: bool,
    /// How hard the subject moves during a moving episode (0-1)
    pub intensity: f32,
    /// Clock time (ms) at which a new episode is drawn
    pub change_at: u64,
}

impl FallbackMovementState {
    /// Probability before noise: 0.3-0.8 while moving, 0-0.2 while still
    pub fn base_probability(&self, rng: &mut Pcg32) -> f32 {
        if self.is_moving {
            0.3 + self.intensity * 0.5
        } else {
            rng.random::<f32>() * 0.2
        }
    }
}

#[derive(Debug, Clone)]
pub struct FallbackSynthesizer {
    rng: Pcg32,
    state: Option<FallbackMovementState>,
}

impl FallbackSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RngState::new(seed, RngState::FALLBACK_STREAM).to_rng(),
            state: None,
        }
    }

    pub fn state(&self) -> Option<FallbackMovementState> {
        self.state
    }

    fn draw_state(
        &mut self,
        now: u64,
        threshold: f32,
        window: std::ops::Range<u64>,
    ) -> FallbackMovementState {
        FallbackMovementState {
            is_moving: self.rng.random::<f32>() > threshold,
            intensity: self.rng.random::<f32>(),
            change_at: now + self.rng.random_range(window),
        }
    }

    /// Movement probability at clock time `now`
    pub fn sample(&mut self, now: u64) -> f32 {
        let current = self.state;
        let state = match current {
            None => self.draw_state(now, FIRST_MOVING_THRESHOLD, FIRST_EPISODE_MS),
            Some(s) if now >= s.change_at => {
                self.draw_state(now, NEXT_MOVING_THRESHOLD, NEXT_EPISODE_MS)
            }
            Some(s) => s,
        };
        self.state = Some(state);

        let base = state.base_probability(&mut self.rng);
        let noise = self.rng.random_range(-NOISE..NOISE);
        (base + noise).clamp(0.0, 1.0)
    }
}
