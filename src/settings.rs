//! Game settings and tuning
//!
//! Persisted as JSON next to the binary. Defaults reproduce the classic rules.

use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::GameError;

/// Phase durations in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTiming {
    pub green_min_ms: u64,
    pub green_max_ms: u64,
    pub red_min_ms: u64,
    pub red_max_ms: u64,
    /// Pause between a survived red light and the next round
    pub survive_pause_ms: u64,
    /// Time spent caught before the next round
    pub caught_grace_ms: u64,
    pub countdown_step_ms: u64,
    /// How long "GO!" stays up before the first green light
    pub countdown_go_ms: u64,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self {
            green_min_ms: GREEN_MIN_MS,
            green_max_ms: GREEN_MAX_MS,
            red_min_ms: RED_MIN_MS,
            red_max_ms: RED_MAX_MS,
            survive_pause_ms: SURVIVE_PAUSE_MS,
            caught_grace_ms: CAUGHT_GRACE_MS,
            countdown_step_ms: COUNTDOWN_STEP_MS,
            countdown_go_ms: COUNTDOWN_GO_MS,
        }
    }
}

impl PhaseTiming {
    pub fn green_range(&self) -> Range<u64> {
        self.green_min_ms..self.green_max_ms
    }

    pub fn red_range(&self) -> Range<u64> {
        self.red_min_ms..self.red_max_ms
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Detection ===
    /// Movement probability that counts as moving during a red light
    pub detection_threshold: f32,
    /// Skip the classifier entirely and use synthesized movement
    pub force_fallback: bool,
    /// Where the host should fetch the trained model from
    pub model_url: String,

    // === Rules ===
    pub starting_lives: u8,
    pub points_per_round: u32,
    pub countdown_from: u8,
    pub timing: PhaseTiming,

    // === Determinism ===
    /// Fixed RNG seed (random per run when absent)
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection_threshold: MOVE_DETECTION_THRESHOLD,
            force_fallback: false,
            model_url: DEFAULT_MODEL_URL.to_string(),

            starting_lives: STARTING_LIVES,
            points_per_round: POINTS_PER_ROUND,
            countdown_from: COUNTDOWN_FROM,
            timing: PhaseTiming::default(),

            seed: None,
        }
    }
}

impl Settings {
    /// Model topology URL derived from `model_url`
    pub fn model_json_url(&self) -> String {
        format!("{}model.json", self.model_url)
    }

    /// Model metadata URL derived from `model_url`
    pub fn metadata_json_url(&self) -> String {
        format!("{}metadata.json", self.model_url)
    }

    /// Reject settings the game rules cannot run with
    pub fn validate(&self) -> Result<(), GameError> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(GameError::InvalidSettings(format!(
                "detection_threshold {} outside [0, 1]",
                self.detection_threshold
            )));
        }
        if self.starting_lives == 0 {
            return Err(GameError::InvalidSettings(
                "starting_lives must be at least 1".into(),
            ));
        }
        let t = &self.timing;
        for (name, min, max) in [
            ("green", t.green_min_ms, t.green_max_ms),
            ("red", t.red_min_ms, t.red_max_ms),
        ] {
            if min >= max {
                return Err(GameError::InvalidSettings(format!(
                    "{name} range {min}..{max} is empty"
                )));
            }
        }
        Ok(())
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let json = fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings ({e})");
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GameError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
