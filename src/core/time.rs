//! Frame timing

use std::time::{Duration, Instant};

/// Longest step handed to game logic; a stall (window drag, breakpoint)
/// becomes one long frame instead of a jump.
pub const MAX_DELTA: Duration = Duration::from_millis(250);

/// Clock advanced once per frame by the time stage
#[derive(Debug, Clone)]
pub struct Time {
    last: Instant,
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
}

impl Time {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Sample the wall clock
    pub fn update(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        self.advance(delta);
    }

    /// Step by a fixed amount without reading the clock
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta.min(MAX_DELTA);
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    #[must_use]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Frames stepped so far
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(16));
        assert_eq!(time.delta(), Duration::from_millis(16));
        assert_eq!(time.elapsed(), Duration::from_millis(32));
        assert_eq!(time.frame_count(), 2);
    }

    #[test]
    fn test_delta_clamped() {
        let mut time = Time::new();
        time.advance(Duration::from_secs(3));
        assert_eq!(time.delta(), MAX_DELTA);
    }
}
