//! Time management utilities

use std::time::Instant;

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.delta_time = elapsed.as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Source of per-frame elapsed time for the renderer
///
/// Animations advance by whatever this clock reports each frame. A fixed
/// step makes playback deterministic regardless of wall-clock time.
pub enum FrameClock {
    /// Measure real elapsed time between frames
    Realtime(Timer),
    /// Advance by a constant number of milliseconds per frame
    Fixed {
        /// Step in milliseconds
        step_ms: f64,
    },
}

impl FrameClock {
    /// Create a clock from an optional fixed step
    pub fn from_fixed_step(step_ms: Option<f64>) -> Self {
        match step_ms {
            Some(step_ms) => Self::Fixed { step_ms },
            None => Self::Realtime(Timer::new()),
        }
    }

    /// Advance the clock by one frame and return the delta in milliseconds
    pub fn tick(&mut self) -> f64 {
        match self {
            Self::Realtime(timer) => {
                timer.update();
                f64::from(timer.delta_time()) * 1000.0
            }
            Self::Fixed { step_ms } => *step_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_is_constant() {
        let mut clock = FrameClock::from_fixed_step(Some(16.0));
        assert_eq!(clock.tick(), 16.0);
        assert_eq!(clock.tick(), 16.0);
    }

    #[test]
    fn test_realtime_clock_counts_frames() {
        let mut clock = FrameClock::from_fixed_step(None);
        assert!(clock.tick() >= 0.0);
        if let FrameClock::Realtime(timer) = &clock {
            assert_eq!(timer.frame_count(), 1);
        } else {
            panic!("expected realtime clock");
        }
    }
}
