//! Red Light, Green Light entry point
//!
//! Runs a headless game on a simulated 60 Hz clock with synthesized movement.
//! Camera and model wiring belong to the hosting front end.

use red_light::Settings;
use red_light::platform::headless::{HeadlessSensor, LogPresenter};
use red_light::session::Session;
use red_light::sim::GameState;

/// Simulated display refresh interval (ms)
const FRAME_MS: u64 = 16;
/// Give up after this much simulated time (ms)
const MAX_SIM_MS: u64 = 10 * 60 * 1000;

fn main() {
    env_logger::init();
    log::info!("Red Light, Green Light (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };

    let mut session = match Session::new(
        settings,
        Box::new(HeadlessSensor::new()),
        Box::new(LogPresenter::default()),
    ) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Invalid settings: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = session.start(0) {
        log::error!("Could not start game: {e}");
        std::process::exit(1);
    }

    let mut now = 0;
    while session.is_ticking() && now < MAX_SIM_MS {
        now += FRAME_MS;
        session.frame(now);
    }

    let stats = session.stats();
    if session.state() == GameState::GameOver {
        println!(
            "Game over after {:.1}s: {} points in {} rounds",
            now as f64 / 1000.0,
            stats.score,
            stats.round
        );
    } else {
        println!(
            "Time's up: {} points in {} rounds with {} lives left",
            stats.score, stats.round, stats.lives
        );
        session.stop();
    }
}
