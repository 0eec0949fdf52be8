//! Movement detection
//!
//! A `MovementSource` turns a camera frame into the probability that the
//! player is moving. Two sources exist: one backed by a trained classifier and
//! a synthetic fallback. A session picks one at start and can be downgraded to
//! the fallback exactly once, permanently.

pub mod fallback;

pub use fallback::{FallbackMovementState, FallbackSynthesizer};

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::platform::{Classifier, Frame};
use crate::sanitize_probability;

/// One labelled classifier output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }

    /// "<label>: <percent>%" with one decimal
    pub fn debug_label(&self) -> String {
        format!("{}: {:.1}%", self.label, self.probability * 100.0)
    }
}

/// Which kind of source is producing samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Model,
    Fallback,
}

pub trait MovementSource {
    /// Movement probability in [0, 1] for this frame
    fn sample(&mut self, frame: &Frame, now: u64) -> Result<f32, GameError>;
    /// Labelled output of the last successful sample
    fn labelled_output(&self) -> &[Prediction];
    fn kind(&self) -> SourceKind;
}

fn is_moving_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("moving") || lower.contains("motion") || label == "Class 1"
}

fn is_still_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("still") || lower.contains("static") || label == "Class 0"
}

/// Pick the moving probability out of a classifier's output.
///
/// Prefers a moving-style label, then the complement of a still-style label,
/// then the second entry.
pub fn moving_probability(predictions: &[Prediction]) -> f32 {
    let p = if let Some(moving) = predictions.iter().find(|p| is_moving_label(&p.label)) {
        moving.probability
    } else if let Some(still) = predictions.iter().find(|p| is_still_label(&p.label)) {
        1.0 - still.probability
    } else {
        predictions.get(1).map(|p| p.probability).unwrap_or(0.0)
    };
    sanitize_probability(p)
}

/// Source backed by a trained classifier
pub struct ModelSource {
    classifier: Box<dyn Classifier>,
    last: Vec<Prediction>,
}

impl ModelSource {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            last: Vec::new(),
        }
    }
}

impl MovementSource for ModelSource {
    fn sample(&mut self, frame: &Frame, _now: u64) -> Result<f32, GameError> {
        let predictions = self.classifier.classify(frame)?;
        log::debug!(
            "Predictions: {}",
            predictions
                .iter()
                .map(Prediction::debug_label)
                .collect::<Vec<_>>()
                .join(", ")
        );
        let p = moving_probability(&predictions);
        self.last = predictions;
        Ok(p)
    }

    fn labelled_output(&self) -> &[Prediction] {
        &self.last
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Model
    }
}

/// Source that synthesizes plausible movement without a classifier
pub struct FallbackSource {
    synth: FallbackSynthesizer,
    last: Vec<Prediction>,
}

impl FallbackSource {
    pub fn new(seed: u64) -> Self {
        Self {
            synth: FallbackSynthesizer::new(seed),
            last: Vec::new(),
        }
    }
}

impl MovementSource for FallbackSource {
    fn sample(&mut self, _frame: &Frame, now: u64) -> Result<f32, GameError> {
        let p = self.synth.sample(now);
        self.last = vec![Prediction::new("Moving", p), Prediction::new("Still", 1.0 - p)];
        Ok(p)
    }

    fn labelled_output(&self) -> &[Prediction] {
        &self.last
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Fallback
    }
}

/// The movement source of one game session
pub struct Detector {
    source: Box<dyn MovementSource>,
    seed: u64,
}

impl Detector {
    /// Classifier-backed detector
    pub fn with_classifier(classifier: Box<dyn Classifier>, seed: u64) -> Self {
        Self {
            source: Box::new(ModelSource::new(classifier)),
            seed,
        }
    }

    /// Detector that synthesizes movement from the start
    pub fn fallback(seed: u64) -> Self {
        Self {
            source: Box::new(FallbackSource::new(seed)),
            seed,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn is_fallback(&self) -> bool {
        self.kind() == SourceKind::Fallback
    }

    pub fn labelled_output(&self) -> &[Prediction] {
        self.source.labelled_output()
    }

    /// Permanently switch to the fallback source. Returns false if already there.
    pub fn downgrade(&mut self) -> bool {
        if self.is_fallback() {
            return false;
        }
        log::warn!("Switching to fallback movement detection for the rest of the session");
        self.source = Box::new(FallbackSource::new(self.seed));
        true
    }

    /// Sample the source. A classification failure downgrades the session
    /// and the fallback answers for this frame instead.
    pub fn sample(&mut self, frame: &Frame, now: u64) -> f32 {
        match self.source.sample(frame, now) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Prediction error: {e}");
                self.downgrade();
                self.source.sample(frame, now).unwrap_or_else(|e| {
                    log::warn!("Fallback sample failed: {e}");
                    0.0
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preds(items: &[(&str, f32)]) -> Vec<Prediction> {
        items.iter().map(|(l, p)| Prediction::new(*l, *p)).collect()
    }

    struct Failing;

    impl Classifier for Failing {
        fn classify(&mut self, _frame: &Frame) -> Result<Vec<Prediction>, GameError> {
            Err(GameError::Classification("model crashed".into()))
        }
    }

    struct Fixed(Vec<Prediction>);

    impl Classifier for Fixed {
        fn classify(&mut self, _frame: &Frame) -> Result<Vec<Prediction>, GameError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_moving_label_wins() {
        assert_eq!(moving_probability(&preds(&[("Still", 0.2), ("MOVING", 0.8)])), 0.8);
        assert_eq!(moving_probability(&preds(&[("big motion", 0.55), ("other", 0.45)])), 0.55);
        assert_eq!(moving_probability(&preds(&[("Class 0", 0.3), ("Class 1", 0.7)])), 0.7);
    }

    #[test]
    fn test_still_label_complement() {
        let p = moving_probability(&preds(&[("Standing still", 0.9), ("Jumping", 0.1)]));
        assert!((p - 0.1).abs() < 1e-6);
        let p = moving_probability(&preds(&[("Static", 0.25)]));
        assert!((p - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_generic_labels_are_case_sensitive() {
        // "class 1" is not the generic label, so the second entry is used
        let p = moving_probability(&preds(&[("class 1", 0.9), ("x", 0.1)]));
        assert!((p - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_second_entry_or_zero() {
        assert_eq!(moving_probability(&preds(&[("a", 0.4), ("b", 0.6)])), 0.6);
        assert_eq!(moving_probability(&preds(&[("a", 0.4)])), 0.0);
        assert_eq!(moving_probability(&[]), 0.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(moving_probability(&preds(&[("Moving", 1.7)])), 1.0);
        assert_eq!(moving_probability(&preds(&[("Moving", f32::NAN)])), 0.0);
    }

    #[test]
    fn test_debug_label_format() {
        assert_eq!(Prediction::new("Moving", 0.8234).debug_label(), "Moving: 82.3%");
    }

    #[test]
    fn test_model_source_keeps_output() {
        let mut detector = Detector::with_classifier(
            Box::new(Fixed(preds(&[("Still", 0.4), ("Moving", 0.6)]))),
            1,
        );
        let p = detector.sample(&Frame::default(), 0);
        assert_eq!(p, 0.6);
        assert_eq!(detector.kind(), SourceKind::Model);
        assert_eq!(detector.labelled_output().len(), 2);
    }

    #[test]
    fn test_failure_downgrades_permanently() {
        let mut detector = Detector::with_classifier(Box::new(Failing), 5);
        let p = detector.sample(&Frame::default(), 0);
        assert!((0.0..=1.0).contains(&p));
        assert!(detector.is_fallback());
        let labels: Vec<_> = detector.labelled_output().iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["Moving", "Still"]);
        assert!(!detector.downgrade());
    }

    #[test]
    fn test_fallback_output_sums_to_one() {
        let mut detector = Detector::fallback(3);
        for t in (0..5_000).step_by(100) {
            detector.sample(&Frame::default(), t);
            let total: f32 = detector.labelled_output().iter().map(|p| p.probability).sum();
            assert!((total - 1.0).abs() < 1e-6);
        }
    }
}
