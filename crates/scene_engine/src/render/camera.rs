//! # 2D Camera
//!
//! World-to-screen transform for the scene tree. The cull pass computes every
//! node's render position as `position - camera.position + camera.focus_delta()`.
//!
//! The camera also owns two per-frame motions applied in [`Camera::update`]:
//! smoothed following of a target point and a decaying screen shake.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::foundation::math::Vec2;

/// Active screen shake
#[derive(Debug, Clone)]
struct Shake {
    intensity: f32,
    remaining_ms: f64,
    duration_ms: f64,
}

/// 2D camera with focus offset and shake
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec2,

    /// Screen-space offset of the focus point (e.g. half the viewport to center)
    pub focus: Vec2,

    /// World point the camera eases towards, if any
    follow_target: Option<Vec2>,

    /// Fraction of the remaining distance covered per 16ms frame (0-1)
    follow_smoothing: f32,

    shake: Option<Shake>,
    shake_offset: Vec2,
    rng: StdRng,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::zeros())
    }
}

impl Camera {
    /// Create a camera at a world position with no focus offset
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            focus: Vec2::zeros(),
            follow_target: None,
            follow_smoothing: 1.0,
            shake: None,
            shake_offset: Vec2::zeros(),
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    /// Create a camera whose focus point is the center of the viewport
    pub fn centered(position: Vec2, viewport: Vec2) -> Self {
        Self {
            focus: viewport * 0.5,
            ..Self::new(position)
        }
    }

    /// Reseed the shake jitter generator (for reproducible runs)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Offset applied after subtracting the camera position, including shake
    pub fn focus_delta(&self) -> Vec2 {
        self.focus + self.shake_offset
    }

    /// Transform a world position into screen space
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world - self.position + self.focus_delta()
    }

    /// Ease towards `target` every frame
    ///
    /// `smoothing` is clamped to (0, 1]; 1 snaps immediately.
    pub fn follow(&mut self, target: Vec2, smoothing: f32) {
        self.follow_target = Some(target);
        self.follow_smoothing = smoothing.clamp(f32::EPSILON, 1.0);
    }

    /// Stop following
    pub fn stop_following(&mut self) {
        self.follow_target = None;
    }

    /// Start a shake of up to `intensity` pixels that fades out over `duration_ms`
    pub fn shake(&mut self, intensity: f32, duration_ms: f64) {
        if intensity <= 0.0 || duration_ms <= 0.0 {
            return;
        }
        log::debug!("Camera shake: intensity={} duration={}ms", intensity, duration_ms);
        self.shake = Some(Shake {
            intensity,
            remaining_ms: duration_ms,
            duration_ms,
        });
    }

    /// Whether a shake is in progress
    pub fn is_shaking(&self) -> bool {
        self.shake.is_some()
    }

    /// Advance follow and shake by one frame
    pub fn update(&mut self, delta_ms: f64) {
        if let Some(target) = self.follow_target {
            // Frame-rate independent exponential approach
            let frames = (delta_ms / 16.0).max(0.0) as f32;
            let keep = (1.0 - self.follow_smoothing).powf(frames);
            self.position = target + (self.position - target) * keep;
        }

        match self.shake.as_mut() {
            Some(shake) => {
                shake.remaining_ms -= delta_ms;
                if shake.remaining_ms <= 0.0 {
                    self.shake = None;
                    self.shake_offset = Vec2::zeros();
                } else {
                    let strength = shake.intensity * (shake.remaining_ms / shake.duration_ms) as f32;
                    self.shake_offset = Vec2::new(
                        self.rng.gen_range(-1.0..=1.0) * strength,
                        self.rng.gen_range(-1.0..=1.0) * strength,
                    );
                }
            }
            None => self.shake_offset = Vec2::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_to_screen() {
        let mut camera = Camera::new(Vec2::new(100.0, 50.0));
        camera.focus = Vec2::new(10.0, 10.0);

        let screen = camera.world_to_screen(Vec2::new(150.0, 60.0));
        assert_eq!(screen, Vec2::new(60.0, 20.0));
    }

    #[test]
    fn test_centered_focus() {
        let camera = Camera::centered(Vec2::zeros(), Vec2::new(800.0, 600.0));
        assert_eq!(camera.focus_delta(), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_follow_snaps_with_full_smoothing() {
        let mut camera = Camera::default();
        camera.follow(Vec2::new(30.0, -20.0), 1.0);
        camera.update(16.0);
        assert_relative_eq!(camera.position, Vec2::new(30.0, -20.0), epsilon = 1e-5);
    }

    #[test]
    fn test_follow_moves_partway() {
        let mut camera = Camera::default();
        camera.follow(Vec2::new(100.0, 0.0), 0.5);
        camera.update(16.0);
        assert_relative_eq!(camera.position.x, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn test_shake_is_bounded_and_expires() {
        let mut camera = Camera::default().with_seed(7);
        camera.shake(5.0, 100.0);

        camera.update(16.0);
        assert!(camera.is_shaking());
        let offset = camera.focus_delta();
        assert!(offset.x.abs() <= 5.0 && offset.y.abs() <= 5.0);

        camera.update(200.0);
        assert!(!camera.is_shaking());
        assert_eq!(camera.focus_delta(), Vec2::zeros());
    }
}
