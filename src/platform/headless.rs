//! Adapters for running without a camera or a screen

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{Classifier, Frame, Presenter, RenderUpdate, Sensor};
use crate::detect::Prediction;
use crate::error::GameError;
use crate::sim::GameState;

/// Sensor producing blank frames, optionally refusing to start
#[derive(Debug, Default)]
pub struct HeadlessSensor {
    running: bool,
    frames: u64,
    unavailable: Option<String>,
}

impl HeadlessSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sensor whose `start` always fails with this reason
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Sensor for HeadlessSensor {
    fn start(&mut self) -> Result<(), GameError> {
        if let Some(reason) = &self.unavailable {
            return Err(GameError::SensorUnavailable(reason.clone()));
        }
        self.running = true;
        Ok(())
    }

    fn current_frame(&mut self) -> Result<Frame, GameError> {
        if !self.running {
            return Err(GameError::SensorUnavailable("camera not started".into()));
        }
        self.frames += 1;
        Ok(Frame {
            index: self.frames,
            width: 400,
            height: 300,
            pixels: Vec::new(),
        })
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

/// Shared control over a `ManualClassifier`
#[derive(Debug, Clone, Default)]
pub struct ClassifierHandle {
    moving: Rc<Cell<f32>>,
    failing: Rc<Cell<bool>>,
    calls: Rc<Cell<u32>>,
}

impl ClassifierHandle {
    /// Moving probability reported from now on
    pub fn set_moving(&self, p: f32) {
        self.moving.set(p);
    }

    /// Make every classification fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Number of classify calls so far
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    /// Loader handing out classifiers controlled by this handle
    pub fn loader(&self) -> impl FnMut() -> Result<Box<dyn Classifier>, GameError> + 'static {
        let handle = self.clone();
        move || {
            Ok(Box::new(ManualClassifier {
                handle: handle.clone(),
            }) as Box<dyn Classifier>)
        }
    }
}

/// Two-class classifier whose answer is set from outside
#[derive(Debug)]
pub struct ManualClassifier {
    handle: ClassifierHandle,
}

impl ManualClassifier {
    pub fn new() -> (Self, ClassifierHandle) {
        let handle = ClassifierHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl Classifier for ManualClassifier {
    fn classify(&mut self, _frame: &Frame) -> Result<Vec<Prediction>, GameError> {
        self.handle.calls.set(self.handle.calls.get() + 1);
        if self.handle.failing.get() {
            return Err(GameError::Classification("classifier crashed".into()));
        }
        let p = self.handle.moving.get();
        Ok(vec![Prediction::new("Still", 1.0 - p), Prediction::new("Moving", p)])
    }
}

/// Logs state and status changes
#[derive(Debug, Default)]
pub struct LogPresenter {
    last_state: Option<GameState>,
    last_status: String,
    last_countdown: Option<u8>,
}

impl Presenter for LogPresenter {
    fn render(&mut self, update: &RenderUpdate) {
        if self.last_state != Some(update.state) {
            log::info!(
                "[{}] score={} round={} lives={}",
                update.light_text,
                update.stats.score,
                update.stats.round,
                update.stats.lives
            );
            self.last_state = Some(update.state);
        }
        if self.last_countdown != update.countdown {
            if let Some(text) = update.countdown_text() {
                log::info!("{text}");
            }
            self.last_countdown = update.countdown;
        }
        if self.last_status != update.status_message {
            log::info!("{}", update.status_message);
            self.last_status = update.status_message.clone();
        }
        log::trace!("movement {}% {:?}", update.movement_percent, update.debug_labels);
    }
}

/// Keeps every update for inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    updates: Rc<RefCell<Vec<RenderUpdate>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<RenderUpdate> {
        self.updates.borrow().clone()
    }

    pub fn last(&self) -> Option<RenderUpdate> {
        self.updates.borrow().last().cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, update: &RenderUpdate) {
        self.updates.borrow_mut().push(update.clone());
    }
}
