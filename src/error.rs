//! Error taxonomy for sessions, adapters and configuration

use thiserror::Error;

use crate::sim::GameState;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Camera unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Classifier failed to load: {0}")]
    ClassifierLoad(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Cannot {command} while {state:?}")]
    InvalidCommand {
        command: &'static str,
        state: GameState,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GameError {
    /// Whether the game can carry on after this error.
    ///
    /// Classifier failures downgrade the session to the fallback source;
    /// everything else stops the operation that raised it.
    pub fn is_recoverable(&self) -> bool {
        match self {
            GameError::ClassifierLoad(_) => true,
            GameError::Classification(_) => true,
            GameError::SensorUnavailable(_) => false,
            GameError::InvalidCommand { .. } => false,
            GameError::InvalidSettings(_) => false,
            GameError::Io(_) | GameError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_taxonomy() {
        assert!(GameError::ClassifierLoad("offline".into()).is_recoverable());
        assert!(GameError::Classification("bad frame".into()).is_recoverable());
        assert!(!GameError::SensorUnavailable("denied".into()).is_recoverable());
    }

    #[test]
    fn test_invalid_command_message() {
        let err = GameError::InvalidCommand {
            command: "start",
            state: GameState::Red,
        };
        assert_eq!(err.to_string(), "Cannot start while Red");
    }
}
