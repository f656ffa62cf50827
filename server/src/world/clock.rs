//! Monotonic simulation clock.
//!
//! Every timer in the simulation is a deadline in clock seconds. The world
//! advances the clock once per tick; nothing ever sleeps on a timer.

/// Simulation time, advanced once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameClock {
    /// Seconds since the world started
    pub now: f64,
    /// Number of ticks advanced so far
    pub tick: u64,
    /// Seconds covered by the most recent tick
    pub delta: f64,
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta` seconds. Negative deltas are treated as zero.
    pub fn advance(&mut self, delta: f64) {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.now += delta;
        self.delta = delta;
        self.tick += 1;
    }

    pub fn has_passed(&self, deadline: f64) -> bool {
        self.now >= deadline
    }
}
