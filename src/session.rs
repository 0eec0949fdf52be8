//! Game session and per-frame loop driver
//!
//! A `Session` owns the state machine, the movement source and the adapters.
//! The host calls `frame(now)` on every display refresh; the session only does
//! work when its frame tick is armed, and re-arms it after each tick while the
//! game is active. Stop and game over disarm it synchronously.

use crate::detect::{Detector, Prediction};
use crate::error::GameError;
use crate::platform::{ClassifierLoader, Frame, Presenter, RenderUpdate, Sensor, button_label};
use crate::settings::Settings;
use crate::sim::{Capture, GameEvent, GameMachine, GameState, PhaseTimer, Stats, TimerSlot};
use crate::to_percent;

/// Marker for the frame tick slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameTick;

/// What one call to `Session::frame` did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No tick was scheduled
    Idle,
    /// A movement sample was taken and applied
    Sampled {
        probability: f32,
        capture: Option<Capture>,
        fired: Option<PhaseTimer>,
        events: Vec<GameEvent>,
        /// Frame grab error this tick recovered from by switching to fallback
        recovered: Option<String>,
    },
}

pub struct Session {
    settings: Settings,
    seed: u64,
    starts: u64,
    machine: GameMachine,
    detector: Detector,
    sensor: Box<dyn Sensor>,
    loader: Option<Box<dyn ClassifierLoader>>,
    presenter: Box<dyn Presenter>,
    frame_tick: TimerSlot<FrameTick>,
    movement_percent: u8,
    fallback_notice: bool,
}

impl Session {
    /// Create a session. Fails with `GameError::InvalidSettings` if the
    /// settings do not validate.
    pub fn new(
        settings: Settings,
        sensor: Box<dyn Sensor>,
        presenter: Box<dyn Presenter>,
    ) -> Result<Self, GameError> {
        settings.validate()?;
        let seed = settings.seed.unwrap_or_else(rand::random);
        log::info!("New session with seed {}", seed);
        Ok(Self {
            machine: GameMachine::new(&settings, seed),
            detector: Detector::fallback(seed),
            settings,
            seed,
            starts: 0,
            sensor,
            loader: None,
            presenter,
            frame_tick: TimerSlot::new(),
            movement_percent: 0,
            fallback_notice: false,
        })
    }

    /// Use `loader` to fetch the classifier at every start
    pub fn with_loader(mut self, loader: Box<dyn ClassifierLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> GameState {
        self.machine.state()
    }

    pub fn stats(&self) -> Stats {
        self.machine.stats()
    }

    pub fn machine(&self) -> &GameMachine {
        &self.machine
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Whether a frame tick is scheduled
    pub fn is_ticking(&self) -> bool {
        self.frame_tick.is_armed()
    }

    /// Start/stop control: starts from waiting or game over, stops otherwise
    pub fn toggle(&mut self, now: u64) -> Result<(), GameError> {
        if self.state().can_start() {
            self.start(now)
        } else {
            self.stop();
            Ok(())
        }
    }

    /// Start a game. Fails without leaving `waiting` if the camera is unavailable.
    pub fn start(&mut self, now: u64) -> Result<(), GameError> {
        let state = self.state();
        if !state.can_start() {
            return Err(GameError::InvalidCommand {
                command: "start",
                state,
            });
        }
        if state == GameState::GameOver {
            // Full restart
            self.stop();
        }

        self.starts += 1;
        self.detector = self.load_detector();

        self.machine.set_status("Starting camera...");
        self.present();
        if let Err(e) = self.sensor.start() {
            log::error!("Camera setup failed: {e}");
            self.machine.set_status(format!("Error: {e}"));
            self.present();
            return Err(e);
        }

        self.machine.start(now)?;
        self.movement_percent = 0;
        self.frame_tick.arm(FrameTick, now);
        self.machine.drain_events();
        self.present();
        Ok(())
    }

    fn load_detector(&mut self) -> Detector {
        let seed = self.seed.wrapping_add(self.starts);
        if self.settings.force_fallback {
            log::info!("Fallback detection forced by settings");
            self.fallback_notice = true;
            return Detector::fallback(seed);
        }

        self.machine.set_status("Loading AI model...");
        self.present();
        let loaded = match self.loader.as_mut() {
            Some(loader) => loader.load(),
            None => Err(GameError::ClassifierLoad("no classifier configured".into())),
        };

        match loaded {
            Ok(classifier) => {
                log::info!("Model loaded from {}", self.settings.model_url);
                self.fallback_notice = false;
                self.machine.set_status("AI model loaded successfully!");
                self.present();
                Detector::with_classifier(classifier, seed)
            }
            Err(e) => {
                log::warn!("AI model loading failed: {e}");
                self.fallback_notice = true;
                self.machine.set_status("Using fallback motion detection");
                self.present();
                Detector::fallback(seed)
            }
        }
    }

    /// Stop the game: cancel the frame tick and phase timer, release the camera
    pub fn stop(&mut self) {
        self.frame_tick.cancel();
        self.machine.stop();
        self.machine.drain_events();
        self.sensor.stop();
        self.movement_percent = 0;
        self.fallback_notice = false;
        self.present();
    }

    /// Switch the rest of this session to synthesized movement
    pub fn force_fallback(&mut self) {
        self.detector.downgrade();
        self.fallback_notice = true;
    }

    /// Run one frame of the game loop at clock time `now`
    pub fn frame(&mut self, now: u64) -> TickOutcome {
        if self.frame_tick.take_due(now).is_none() {
            return TickOutcome::Idle;
        }
        if self.state() == GameState::Waiting {
            return TickOutcome::Idle;
        }

        let outcome = self.run_tick(now);

        // Game over and stop end the loop here, not on the next frame
        if self.state().is_active() {
            self.frame_tick.arm(FrameTick, now);
        }
        outcome
    }

    fn run_tick(&mut self, now: u64) -> TickOutcome {
        // Without a frame the fallback source still answers and timers still run
        let (frame, recovered) = match self.sensor.current_frame() {
            Ok(frame) => (frame, None),
            Err(e) => {
                log::error!("Game loop error: {e}");
                self.force_fallback();
                (Frame::default(), Some(e.to_string()))
            }
        };

        let was_fallback = self.detector.is_fallback();
        let probability = self.detector.sample(&frame, now);
        if !was_fallback && self.detector.is_fallback() {
            self.fallback_notice = true;
        }
        self.movement_percent = to_percent(probability);

        // A capture takes priority over this frame's timer
        let capture = self.machine.observe(probability, now);
        let fired = match capture {
            Some(_) => None,
            None => self.machine.fire_due(now),
        };

        self.present();
        TickOutcome::Sampled {
            probability,
            capture,
            fired,
            events: self.machine.drain_events(),
            recovered,
        }
    }

    /// Snapshot of everything the presenter shows
    pub fn render_update(&self) -> RenderUpdate {
        let state = self.state();
        let stats = self.stats();
        let active = state != GameState::Waiting;
        RenderUpdate {
            state,
            stats,
            countdown: (state == GameState::Countdown).then(|| self.machine.countdown()),
            light_text: state.light_text(),
            status_message: self.machine.status().to_string(),
            button_label: button_label(state, &stats),
            movement_percent: if active { self.movement_percent } else { 0 },
            debug_labels: if active {
                self.detector
                    .labelled_output()
                    .iter()
                    .map(Prediction::debug_label)
                    .collect()
            } else {
                Vec::new()
            },
            fallback_notice: self.fallback_notice,
        }
    }

    fn present(&mut self) {
        let update = self.render_update();
        self.presenter.render(&update);
    }
}
