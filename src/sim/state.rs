//! Game state and core bookkeeping types

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Current state of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameState {
    /// No game running, waiting for a start command
    #[default]
    Waiting,
    /// 3, 2, 1, GO!
    Countdown,
    /// Movement allowed
    Green,
    /// Movement forbidden, samples are checked against the threshold
    Red,
    /// Caught moving with lives left, next round follows shortly
    Caught,
    /// Out of lives
    GameOver,
}

impl GameState {
    /// Text shown on the light display
    pub fn light_text(&self) -> &'static str {
        match self {
            GameState::Waiting => "Click Start to Play!",
            GameState::Countdown => "Get Ready!",
            GameState::Green => "GREEN LIGHT - Move!",
            GameState::Red => "RED LIGHT - FREEZE!",
            GameState::Caught => "CAUGHT!",
            GameState::GameOver => "GAME OVER",
        }
    }

    /// Whether the frame loop keeps running in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, GameState::Waiting | GameState::GameOver)
    }

    /// Whether a start command is accepted
    pub fn can_start(&self) -> bool {
        matches!(self, GameState::Waiting | GameState::GameOver)
    }
}

/// Score, round and lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub score: u32,
    pub round: u32,
    pub lives: u8,
}

/// Partial stats update; `None` fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsPatch {
    pub score: Option<u32>,
    pub round: Option<u32>,
    pub lives: Option<u8>,
}

impl Stats {
    pub fn new(lives: u8) -> Self {
        Self {
            score: 0,
            round: 0,
            lives,
        }
    }

    /// Merge a partial update into the stats
    pub fn update(&mut self, patch: StatsPatch) {
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(round) = patch.round {
            self.round = round;
        }
        if let Some(lives) = patch.lives {
            self.lives = lives;
        }
    }
}

/// RNG stream identity so a session seed reproduces every random draw
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub const TIMER_STREAM: u64 = 1;
    pub const FALLBACK_STREAM: u64 = 2;

    pub fn new(seed: u64, stream: u64) -> Self {
        Self { seed, stream }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream)
    }
}

/// Something that happened inside the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Started,
    Stopped,
    /// Countdown moved to this number (0 means "GO!")
    Countdown(u8),
    RoundStarted { round: u32 },
    RedLight,
    Survived { score: u32 },
    Caught { lives: u8 },
    GameOver { score: u32, rounds: u32 },
}
