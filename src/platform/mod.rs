//! Platform abstraction layer
//!
//! The game core talks to the outside world through these seams:
//! - `Sensor`: camera frames
//! - `Classifier` / `ClassifierLoader`: the trained movement model
//! - `Presenter`: whatever renders the light, stats and meters
//!
//! `headless` holds implementations without a camera or a screen, used by the
//! native binary and by tests.

pub mod headless;

use serde::Serialize;

use crate::detect::Prediction;
use crate::error::GameError;
use crate::sim::{GameState, Stats};

/// One captured camera frame. Opaque to the game core.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Monotonic frame counter
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Camera/movement sensor
pub trait Sensor {
    /// Acquire the device. Fails with `GameError::SensorUnavailable`.
    fn start(&mut self) -> Result<(), GameError>;
    /// Grab the most recent frame
    fn current_frame(&mut self) -> Result<Frame, GameError>;
    /// Release the device
    fn stop(&mut self);
}

/// Image classifier producing labelled probabilities
pub trait Classifier {
    fn classify(&mut self, frame: &Frame) -> Result<Vec<Prediction>, GameError>;
}

/// Loads the classifier at session start
pub trait ClassifierLoader {
    fn load(&mut self) -> Result<Box<dyn Classifier>, GameError>;
}

impl<F> ClassifierLoader for F
where
    F: FnMut() -> Result<Box<dyn Classifier>, GameError>,
{
    fn load(&mut self) -> Result<Box<dyn Classifier>, GameError> {
        self()
    }
}

/// Everything a presenter needs to draw one update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderUpdate {
    pub state: GameState,
    pub stats: Stats,
    /// Countdown number while counting down ("GO!" at 0)
    pub countdown: Option<u8>,
    pub light_text: &'static str,
    pub status_message: String,
    pub button_label: &'static str,
    pub movement_percent: u8,
    /// Formatted classifier output, one entry per label
    pub debug_labels: Vec<String>,
    /// Whether the fallback-detection notice should be visible
    pub fallback_notice: bool,
}

impl RenderUpdate {
    /// Countdown overlay text, if the overlay is visible
    pub fn countdown_text(&self) -> Option<String> {
        self.countdown.map(|n| if n == 0 { "GO!".to_string() } else { n.to_string() })
    }
}

/// Renders updates. Never read back by the core.
pub trait Presenter {
    fn render(&mut self, update: &RenderUpdate);
}

/// Label for the single start/stop control
pub fn button_label(state: GameState, stats: &Stats) -> &'static str {
    match state {
        GameState::Waiting => "Start Game",
        GameState::GameOver if stats.lives == 0 => "Play Again",
        GameState::GameOver => "Start Game",
        _ => "Stop Game",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_labels() {
        let stats = Stats::new(3);
        assert_eq!(button_label(GameState::Waiting, &stats), "Start Game");
        assert_eq!(button_label(GameState::Red, &stats), "Stop Game");
        assert_eq!(button_label(GameState::Caught, &stats), "Stop Game");
        let dead = Stats::new(0);
        assert_eq!(button_label(GameState::GameOver, &dead), "Play Again");
    }

    #[test]
    fn test_closure_loader() {
        let mut loader = || -> Result<Box<dyn Classifier>, GameError> {
            Err(GameError::ClassifierLoad("no network".into()))
        };
        assert!(ClassifierLoader::load(&mut loader).is_err());
    }
}
