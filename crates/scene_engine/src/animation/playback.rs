//! Per-renderable animation playback state

use std::sync::Arc;

use crate::animation::animation::Animation;
use crate::animation::value::Value;

/// Running state of a playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not advancing
    Stopped,
    /// Advancing once per frame
    Running,
}

/// Why a playback stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop` was called
    Explicit,
    /// Elapsed time passed the duration with no repeats left
    Completed,
}

/// Notifications fired by playback state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback (re)started from zero
    Started,
    /// Playback halted
    Stopped(StopReason),
    /// Playback wrapped around; carries the new repeat count
    Repeated(u32),
}

/// An animation bound to one renderable
///
/// The [`Animation`] is shared; elapsed time and the repeat counter belong to
/// this playback alone.
#[derive(Debug, Clone)]
pub struct AnimationPlayback {
    animation: Arc<Animation>,
    elapsed_ms: f64,
    repeats: u32,
    state: PlaybackState,
}

impl AnimationPlayback {
    /// Bind an animation; playback starts stopped
    pub fn new(animation: Arc<Animation>) -> Self {
        Self {
            animation,
            elapsed_ms: 0.0,
            repeats: 0,
            state: PlaybackState::Stopped,
        }
    }

    /// The bound animation
    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    /// Milliseconds into the current cycle
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Completed repeat cycles since the last start
    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Check if the playback is running
    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    /// Reset to the beginning and run
    pub fn start(&mut self) -> PlaybackEvent {
        self.elapsed_ms = 0.0;
        self.repeats = 0;
        self.state = PlaybackState::Running;
        PlaybackEvent::Started
    }

    /// Halt; returns `None` if already stopped
    pub fn stop(&mut self) -> Option<PlaybackEvent> {
        if !self.is_running() {
            return None;
        }
        self.state = PlaybackState::Stopped;
        Some(PlaybackEvent::Stopped(StopReason::Explicit))
    }

    /// Advance one frame
    ///
    /// Wraps or completes first if the previous frame ran past the duration,
    /// then hands every sampled property to `apply`, then adds `delta_ms` to
    /// the elapsed time. A completing frame samples nothing.
    pub fn advance<F>(&mut self, delta_ms: f64, mut apply: F) -> Option<PlaybackEvent>
    where
        F: FnMut(&str, Value),
    {
        if !self.is_running() {
            return None;
        }

        let mut event = None;
        if self.elapsed_ms > self.animation.duration_ms() {
            let repeat = self.animation.repeat();
            if repeat < 0 || i64::from(self.repeats) < i64::from(repeat) {
                self.elapsed_ms = 0.0;
                self.repeats += 1;
                event = Some(PlaybackEvent::Repeated(self.repeats));
            } else {
                self.state = PlaybackState::Stopped;
                return Some(PlaybackEvent::Stopped(StopReason::Completed));
            }
        }

        for (name, value) in self.animation.sample_all(self.elapsed_ms) {
            apply(name, value);
        }
        self.elapsed_ms += delta_ms;

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::animation::Property;
    use crate::animation::value::ValueType;
    use approx::assert_relative_eq;

    fn ramp(repeat: i32) -> Arc<Animation> {
        Arc::new(
            Animation::builder("ramp", 1000.0)
                .repeat(repeat)
                .property(
                    Property::new("x", ValueType::Float)
                        .with_keyframe(0.0, Value::Float(0.0))
                        .with_keyframe(1000.0, Value::Float(100.0)),
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_stopped_playback_does_nothing() {
        let mut playback = AnimationPlayback::new(ramp(0));
        let mut applied = 0;
        assert_eq!(playback.advance(100.0, |_, _| applied += 1), None);
        assert_eq!(applied, 0);
        assert_relative_eq!(playback.elapsed_ms(), 0.0);
    }

    #[test]
    fn test_samples_before_advancing() {
        let mut playback = AnimationPlayback::new(ramp(0));
        assert_eq!(playback.start(), PlaybackEvent::Started);

        let mut seen = Vec::new();
        for _ in 0..3 {
            playback.advance(250.0, |_, value| seen.push(value.as_f32().unwrap()));
        }
        assert_eq!(seen, vec![0.0, 25.0, 50.0]);
        assert_relative_eq!(playback.elapsed_ms(), 750.0);
    }

    #[test]
    fn test_repeat_count_is_honoured() {
        let mut playback = AnimationPlayback::new(ramp(2));
        playback.start();

        let mut repeat_events = Vec::new();
        for _ in 0..25 {
            if let Some(PlaybackEvent::Repeated(n)) = playback.advance(100.0, |_, _| {}) {
                repeat_events.push(n);
            }
        }
        assert_eq!(repeat_events, vec![1, 2]);
        assert_eq!(playback.repeats(), 2);
        assert!(playback.is_running());

        let mut completed = false;
        for _ in 0..20 {
            if playback.advance(100.0, |_, _| {}) == Some(PlaybackEvent::Stopped(StopReason::Completed)) {
                completed = true;
                break;
            }
        }
        assert!(completed);
        assert!(!playback.is_running());
        assert_eq!(playback.repeats(), 2);
    }

    #[test]
    fn test_play_once_completes_without_sampling() {
        let mut playback = AnimationPlayback::new(ramp(0));
        playback.start();
        for _ in 0..11 {
            playback.advance(100.0, |_, _| {});
        }
        let mut applied = false;
        let event = playback.advance(100.0, |_, _| applied = true);
        assert_eq!(event, Some(PlaybackEvent::Stopped(StopReason::Completed)));
        assert!(!applied);
    }

    #[test]
    fn test_infinite_repeat_keeps_running() {
        let mut playback = AnimationPlayback::new(ramp(-1));
        playback.start();
        for _ in 0..200 {
            playback.advance(100.0, |_, _| {});
        }
        assert!(playback.is_running());
        assert!(playback.repeats() > 10);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut playback = AnimationPlayback::new(ramp(0));
        assert_eq!(playback.stop(), None);
        playback.start();
        assert_eq!(playback.stop(), Some(PlaybackEvent::Stopped(StopReason::Explicit)));
        assert_eq!(playback.stop(), None);
    }

    #[test]
    fn test_restart_resets_counters() {
        let mut playback = AnimationPlayback::new(ramp(3));
        playback.start();
        for _ in 0..15 {
            playback.advance(100.0, |_, _| {});
        }
        assert_eq!(playback.repeats(), 1);
        playback.start();
        assert_eq!(playback.repeats(), 0);
        assert_relative_eq!(playback.elapsed_ms(), 0.0);
    }
}
