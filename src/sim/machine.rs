//! Game state machine
//!
//! Owns the game state, stats and the single phase timer. Every transition
//! goes through one of the methods here, and every transition that leaves a
//! phase replaces or cancels the timer that phase armed.

use super::state::{GameEvent, GameState, Stats, StatsPatch};
use super::timer::{PhaseTimer, RoundTimer, TimerSlot};
use crate::error::GameError;
use crate::settings::Settings;

/// Result of a capture check that caught the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub probability_percent: u8,
    pub lives_left: u8,
}

#[derive(Debug, Clone)]
pub struct GameMachine {
    state: GameState,
    stats: Stats,
    countdown: u8,
    threshold: f32,
    starting_lives: u8,
    points_per_round: u32,
    countdown_from: u8,
    phase_timer: TimerSlot<PhaseTimer>,
    round_timer: RoundTimer,
    status: String,
    events: Vec<GameEvent>,
}

impl GameMachine {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        Self {
            state: GameState::Waiting,
            stats: Stats::new(settings.starting_lives),
            countdown: 0,
            threshold: settings.detection_threshold,
            starting_lives: settings.starting_lives,
            points_per_round: settings.points_per_round,
            countdown_from: settings.countdown_from,
            phase_timer: TimerSlot::new(),
            round_timer: RoundTimer::new(seed, settings.timing.clone()),
            status: WELCOME.to_string(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Countdown number on display (0 shows "GO!")
    pub fn countdown(&self) -> u8 {
        self.countdown
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Phase timer currently armed and when it is due
    pub fn pending_timer(&self) -> Option<(PhaseTimer, u64)> {
        self.phase_timer.pending()
    }

    /// Drain the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Replace the status line shown to the player
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn update_stats(&mut self, patch: StatsPatch) {
        self.stats.update(patch);
    }

    fn arm(&mut self, timer: PhaseTimer, from: u64) {
        let delay = self.round_timer.delay_for(timer);
        self.phase_timer.arm(timer, from + delay);
    }

    /// Start a new game: reset stats and begin the countdown
    pub fn start(&mut self, now: u64) -> Result<(), GameError> {
        if !self.state.can_start() {
            return Err(GameError::InvalidCommand {
                command: "start",
                state: self.state,
            });
        }

        self.update_stats(StatsPatch {
            score: Some(0),
            round: Some(0),
            lives: Some(self.starting_lives),
        });
        self.state = GameState::Countdown;
        self.countdown = self.countdown_from;
        self.arm(PhaseTimer::CountdownStep, now);
        self.events.push(GameEvent::Started);
        self.events.push(GameEvent::Countdown(self.countdown));
        log::info!("Game started, countdown from {}", self.countdown);
        Ok(())
    }

    /// Stop the game and return to waiting, cancelling any pending timer
    pub fn stop(&mut self) {
        self.phase_timer.cancel();
        self.countdown = 0;
        self.state = GameState::Waiting;
        self.status = WELCOME.to_string();
        self.events.push(GameEvent::Stopped);
        log::info!("Game stopped");
    }

    /// Apply the capture rule to one movement sample.
    ///
    /// Only a red light checks movement; any other state ignores the sample.
    pub fn observe(&mut self, probability: f32, now: u64) -> Option<Capture> {
        if self.state != GameState::Red || probability <= self.threshold {
            return None;
        }
        log::info!(
            "Movement detected during RED LIGHT! {:.1}% > {:.0}%",
            probability * 100.0,
            self.threshold * 100.0
        );
        Some(self.player_caught(crate::to_percent(probability), now))
    }

    fn player_caught(&mut self, probability_percent: u8, now: u64) -> Capture {
        let lives = self.stats.lives.saturating_sub(1);
        self.update_stats(StatsPatch {
            lives: Some(lives),
            ..Default::default()
        });
        self.phase_timer.cancel();

        if lives == 0 {
            self.state = GameState::GameOver;
            self.status = format!(
                "Game Over! Final Score: {} points in {} rounds!",
                self.stats.score, self.stats.round
            );
            self.events.push(GameEvent::GameOver {
                score: self.stats.score,
                rounds: self.stats.round,
            });
            log::info!(
                "Game over: {} points in {} rounds",
                self.stats.score,
                self.stats.round
            );
        } else {
            self.state = GameState::Caught;
            self.status = format!(
                "Caught moving! {} {} left - Get ready for next round!",
                lives,
                if lives == 1 { "life" } else { "lives" }
            );
            self.arm(PhaseTimer::CaughtRecovered, now);
            self.events.push(GameEvent::Caught { lives });
            log::info!("Caught! {} lives left", lives);
        }

        Capture {
            probability_percent,
            lives_left: lives,
        }
    }

    /// Fire the phase timer if it is due. At most one transition per call.
    pub fn fire_due(&mut self, now: u64) -> Option<PhaseTimer> {
        let (timer, due_at) = self.phase_timer.take_due(now)?;
        match timer {
            PhaseTimer::CountdownStep => {
                self.countdown = self.countdown.saturating_sub(1);
                self.events.push(GameEvent::Countdown(self.countdown));
                if self.countdown > 0 {
                    self.arm(PhaseTimer::CountdownStep, due_at);
                } else {
                    self.arm(PhaseTimer::CountdownGo, due_at);
                }
            }
            PhaseTimer::CountdownGo | PhaseTimer::NextRound | PhaseTimer::CaughtRecovered => {
                self.start_new_round(due_at);
            }
            PhaseTimer::GreenExpired => self.switch_to_red(due_at),
            PhaseTimer::RedExpired => self.survive_red(due_at),
        }
        Some(timer)
    }

    fn start_new_round(&mut self, now: u64) {
        self.update_stats(StatsPatch {
            round: Some(self.stats.round + 1),
            ..Default::default()
        });
        self.countdown = 0;
        self.state = GameState::Green;
        self.status = "Move around and have fun!".to_string();
        self.arm(PhaseTimer::GreenExpired, now);
        self.events.push(GameEvent::RoundStarted {
            round: self.stats.round,
        });
        log::info!("Round {}: green light", self.stats.round);
    }

    fn switch_to_red(&mut self, now: u64) {
        self.state = GameState::Red;
        self.status = "Don't move a muscle!".to_string();
        self.arm(PhaseTimer::RedExpired, now);
        self.events.push(GameEvent::RedLight);
        log::info!("Round {}: red light", self.stats.round);
    }

    /// Red light ran out without a capture. The light stays red through the
    /// short pause; a capture during the pause cancels the next round.
    fn survive_red(&mut self, now: u64) {
        self.update_stats(StatsPatch {
            score: Some(self.stats.score + self.points_per_round),
            ..Default::default()
        });
        self.status = format!("Great job! +{} points", self.points_per_round);
        self.arm(PhaseTimer::NextRound, now);
        self.events.push(GameEvent::Survived {
            score: self.stats.score,
        });
        log::info!("Survived round {}, score {}", self.stats.round, self.stats.score);
    }
}

const WELCOME: &str = "Welcome! Click Start Game to begin your challenge.";

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn machine() -> GameMachine {
        GameMachine::new(&Settings::default(), 12345)
    }

    /// Fire timers until the machine reaches `target`, returning the time
    fn run_until(m: &mut GameMachine, target: GameState, mut now: u64) -> u64 {
        for _ in 0..32 {
            if m.state() == target {
                return now;
            }
            let (_, due) = m.pending_timer().expect("a timer should be pending");
            now = due;
            m.fire_due(now);
        }
        panic!("never reached {target:?}");
    }

    #[test]
    fn test_countdown_to_green() {
        let mut m = machine();
        m.start(0).unwrap();
        assert_eq!(m.state(), GameState::Countdown);
        assert_eq!(m.countdown(), 3);
        assert_eq!(m.stats(), Stats { score: 0, round: 0, lives: 3 });

        assert_eq!(m.fire_due(999), None);
        assert_eq!(m.fire_due(1000), Some(PhaseTimer::CountdownStep));
        assert_eq!(m.countdown(), 2);
        m.fire_due(2000);
        m.fire_due(3000);
        assert_eq!(m.countdown(), 0);
        assert_eq!(m.state(), GameState::Countdown);
        assert_eq!(m.fire_due(3500), Some(PhaseTimer::CountdownGo));
        assert_eq!(m.state(), GameState::Green);
        assert_eq!(m.stats().round, 1);

        let events = m.drain_events();
        assert_eq!(
            events,
            vec![
                GameEvent::Started,
                GameEvent::Countdown(3),
                GameEvent::Countdown(2),
                GameEvent::Countdown(1),
                GameEvent::Countdown(0),
                GameEvent::RoundStarted { round: 1 },
            ]
        );
    }

    #[test]
    fn test_start_rejected_while_running() {
        let mut m = machine();
        m.start(0).unwrap();
        assert!(matches!(
            m.start(10),
            Err(GameError::InvalidCommand { command: "start", .. })
        ));
    }

    #[test]
    fn test_green_ignores_movement() {
        let mut m = machine();
        m.start(0).unwrap();
        let now = run_until(&mut m, GameState::Green, 0);
        assert_eq!(m.observe(0.9, now), None);
        assert_eq!(m.stats().lives, 3);
        assert_eq!(m.state(), GameState::Green);
    }

    #[test]
    fn test_red_expiry_awards_points_then_next_round() {
        let mut m = machine();
        m.start(0).unwrap();
        let now = run_until(&mut m, GameState::Red, 0);
        let (timer, due) = m.pending_timer().unwrap();
        assert_eq!(timer, PhaseTimer::RedExpired);
        assert!((now + 2000..now + 5000).contains(&due));

        m.fire_due(due);
        assert_eq!(m.stats().score, 10);
        assert_eq!(m.pending_timer(), Some((PhaseTimer::NextRound, due + 1000)));

        m.fire_due(due + 1000);
        assert_eq!(m.state(), GameState::Green);
        assert_eq!(m.stats().round, 2);
    }

    #[test]
    fn test_capture_in_red_goes_to_caught_then_green() {
        let mut m = machine();
        m.start(0).unwrap();
        let now = run_until(&mut m, GameState::Red, 0);

        let capture = m.observe(0.75, now + 10).unwrap();
        assert_eq!(capture.lives_left, 2);
        assert_eq!(capture.probability_percent, 75);
        assert_eq!(m.state(), GameState::Caught);
        assert_eq!(
            m.pending_timer(),
            Some((PhaseTimer::CaughtRecovered, now + 10 + 2500))
        );

        // Caught ignores further movement
        assert_eq!(m.observe(1.0, now + 20), None);

        m.fire_due(now + 10 + 2500);
        assert_eq!(m.state(), GameState::Green);
        assert_eq!(m.stats().round, 2);
    }

    #[test]
    fn test_capture_cancels_red_timer() {
        let mut m = machine();
        m.start(0).unwrap();
        let now = run_until(&mut m, GameState::Red, 0);
        let (_, red_due) = m.pending_timer().unwrap();
        m.observe(0.9, now).unwrap();

        assert_eq!(m.fire_due(now + 2499), None);
        assert_eq!(m.state(), GameState::Caught);

        // The red timer's due time passes without awarding points
        assert_ne!(m.fire_due(red_due), Some(PhaseTimer::RedExpired));
        assert_eq!(m.stats().score, 0);
    }

    #[test]
    fn test_capture_during_survive_pause_cancels_next_round() {
        let mut m = machine();
        m.start(0).unwrap();
        run_until(&mut m, GameState::Red, 0);
        let (_, red_due) = m.pending_timer().unwrap();
        m.fire_due(red_due);
        assert_eq!(m.state(), GameState::Red);

        m.observe(0.8, red_due + 100).unwrap();
        assert_eq!(m.state(), GameState::Caught);
        assert_eq!(m.stats().score, 10);
        assert_eq!(m.fire_due(red_due + 1000), None);
        assert_eq!(m.state(), GameState::Caught);
    }

    #[test]
    fn test_last_life_is_game_over() {
        let mut m = machine();
        m.start(0).unwrap();
        let mut now = 0;
        for expected in [2u8, 1] {
            now = run_until(&mut m, GameState::Red, now);
            assert_eq!(m.observe(0.9, now).unwrap().lives_left, expected);
            assert_eq!(m.state(), GameState::Caught);
        }
        now = run_until(&mut m, GameState::Red, now);
        assert_eq!(m.observe(0.9, now).unwrap().lives_left, 0);
        assert_eq!(m.state(), GameState::GameOver);
        assert_eq!(m.pending_timer(), None);
        assert!(m.status().starts_with("Game Over! Final Score: 0 points in 3 rounds"));

        // Restart is accepted from game over
        m.start(now + 1).unwrap();
        assert_eq!(m.stats(), Stats { score: 0, round: 0, lives: 3 });
    }

    #[test]
    fn test_stop_cancels_everything() {
        let mut m = machine();
        m.start(0).unwrap();
        run_until(&mut m, GameState::Green, 0);
        m.stop();
        assert_eq!(m.state(), GameState::Waiting);
        assert_eq!(m.pending_timer(), None);
        assert_eq!(m.fire_due(u64::MAX), None);
    }

    fn any_state() -> impl Strategy<Value = GameState> {
        prop_oneof![
            Just(GameState::Waiting),
            Just(GameState::Countdown),
            Just(GameState::Green),
            Just(GameState::Red),
            Just(GameState::Caught),
            Just(GameState::GameOver),
        ]
    }

    /// Drive a fresh machine into `target`
    fn machine_in(target: GameState, seed: u64) -> (GameMachine, u64) {
        let mut m = GameMachine::new(&Settings::default(), seed);
        if target == GameState::Waiting {
            return (m, 0);
        }
        m.start(0).unwrap();
        let now = match target {
            GameState::Waiting | GameState::Countdown => 0,
            GameState::Green | GameState::Red => run_until(&mut m, target, 0),
            GameState::Caught | GameState::GameOver => {
                let mut now = 0;
                loop {
                    now = run_until(&mut m, GameState::Red, now);
                    m.observe(1.0, now);
                    if m.state() == target {
                        break now;
                    }
                }
            }
        };
        (m, now)
    }

    proptest! {
        #[test]
        fn prop_capture_iff_red_and_above_threshold(
            state in any_state(),
            p in 0.0f32..=1.0,
            seed in any::<u64>(),
        ) {
            let (mut m, now) = machine_in(state, seed);
            prop_assert_eq!(m.state(), state);
            let lives = m.stats().lives;
            let captured = m.observe(p, now).is_some();
            prop_assert_eq!(captured, state == GameState::Red && p > 0.6);
            if captured {
                prop_assert_eq!(m.stats().lives, lives - 1);
            } else {
                prop_assert_eq!(m.stats().lives, lives);
            }
        }

        #[test]
        fn prop_still_player_only_leaves_red_by_expiry(
            seed in any::<u64>(),
            samples in proptest::collection::vec(0.0f32..=0.6, 1..200),
        ) {
            let (mut m, start) = machine_in(GameState::Red, seed);
            let (_, due) = m.pending_timer().unwrap();
            prop_assert!(due - start >= 2000 && due - start < 5000);

            let mut now = start;
            for p in samples {
                now += 16;
                prop_assert!(m.observe(p, now).is_none());
                if now >= due {
                    break;
                }
                m.fire_due(now);
                prop_assert_eq!(m.state(), GameState::Red);
            }
            prop_assert_eq!(m.stats().lives, 3);
        }

        #[test]
        fn prop_stats_invariants(
            seed in any::<u64>(),
            samples in proptest::collection::vec(0.0f32..=1.0, 1..400),
        ) {
            let mut m = GameMachine::new(&Settings::default(), seed);
            m.start(0).unwrap();
            let mut now = 0;
            let mut last = m.stats();
            let mut greens = 0u32;
            for p in samples {
                now += 100;
                if m.observe(p, now).is_none() {
                    m.fire_due(now);
                }
                let stats = m.stats();
                prop_assert!(stats.lives <= 3);
                prop_assert!(stats.score >= last.score);
                prop_assert!(stats.score == last.score || stats.score == last.score + 10);
                for event in m.drain_events() {
                    if let GameEvent::RoundStarted { .. } = event {
                        greens += 1;
                    }
                }
                prop_assert_eq!(stats.round, greens);
                prop_assert_eq!(m.state() == GameState::GameOver, stats.lives == 0);
                last = stats;
                if m.state() == GameState::GameOver {
                    break;
                }
            }
        }
    }
}
