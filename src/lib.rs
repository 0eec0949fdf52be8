//! Red Light, Green Light - a movement-detection reaction game
//!
//! Core modules:
//! - `sim`: Deterministic game core (state machine, phase timers, stats)
//! - `detect`: Movement sources (classifier-backed and synthetic fallback)
//! - `platform`: Sensor/classifier/presentation adapter seams
//! - `session`: Per-frame game loop driver and session lifecycle
//! - `settings`: Data-driven game tuning

pub mod detect;
pub mod error;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::GameError;
pub use session::{Session, TickOutcome};
pub use settings::{PhaseTiming, Settings};

/// Game configuration constants
pub mod consts {
    /// Movement probability above which a red-light sample counts as a capture
    pub const MOVE_DETECTION_THRESHOLD: f32 = 0.6;
    /// Lives at the start of every game
    pub const STARTING_LIVES: u8 = 3;
    /// Points for surviving one red light
    pub const POINTS_PER_ROUND: u32 = 10;
    /// Countdown starts from this number
    pub const COUNTDOWN_FROM: u8 = 3;

    /// Green light duration range (ms)
    pub const GREEN_MIN_MS: u64 = 3000;
    pub const GREEN_MAX_MS: u64 = 8000;
    /// Red light duration range (ms)
    pub const RED_MIN_MS: u64 = 2000;
    pub const RED_MAX_MS: u64 = 5000;
    /// Pause after surviving a red light before the next round
    pub const SURVIVE_PAUSE_MS: u64 = 1000;
    /// Time spent in the caught state before play resumes
    pub const CAUGHT_GRACE_MS: u64 = 2500;
    /// Countdown step and "GO!" hold
    pub const COUNTDOWN_STEP_MS: u64 = 1000;
    pub const COUNTDOWN_GO_MS: u64 = 500;

    /// Default Teachable Machine model location (adapter configuration only)
    pub const DEFAULT_MODEL_URL: &str = "https://teachablemachine.withgoogle.com/models/H5t9mZMw9/";
}

/// Convert a probability to the whole percent shown on the movement meter
#[inline]
pub fn to_percent(probability: f32) -> u8 {
    (probability.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Clamp a probability to [0, 1], mapping non-finite values to 0
#[inline]
pub fn sanitize_probability(p: f32) -> f32 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}
