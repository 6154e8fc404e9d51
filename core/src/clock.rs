use core::time::Duration;
use web_time::Instant;

use crate::*;

/// Display-only elapsed time for a game.
///
/// The counter only moves through [`Clock::tick`], which the front end calls once per second. Start and stop come
/// from the engine's lifecycle events, so the clock never looks at game state itself.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    running: bool,
    elapsed_secs: u32,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Seconds counted through ticks
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Wall-clock time since the game started, frozen once it ended, zero if it hasn't started
    pub fn wall_elapsed(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(started_at), Some(ended_at)) => ended_at.saturating_duration_since(started_at),
            (Some(started_at), None) => started_at.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn tick(&mut self) {
        if self.running {
            self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        }
    }

    pub fn start(&mut self) {
        if self.running || self.started_at.is_some() {
            return;
        }
        let now = Instant::now();
        self.started_at = Some(now);
        self.running = true;
        log::debug!("clock started");
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.ended_at = Some(Instant::now());
        self.running = false;
        log::debug!("clock stopped at {}s", self.elapsed_secs);
    }

    /// Back to the initial state, for a new game
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl GameListener for Clock {
    fn started(&mut self) {
        self.start();
    }

    fn ended(&mut self, _status: GameStatus) {
        self.stop();
    }
}
