//! Math utilities and types
//!
//! Provides the 2D math types used by the scene tree, the camera and the
//! rendering backends.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// Axis-aligned rectangle in screen or texture space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Top-left corner
    pub origin: Vec2,
    /// Width and height
    pub size: Vec2,
}

impl Rect {
    /// Create a rectangle from position and size components
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Create a rectangle from an origin and a size vector
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Left edge
    pub fn min_x(&self) -> f32 {
        self.origin.x
    }

    /// Top edge
    pub fn min_y(&self) -> f32 {
        self.origin.y
    }

    /// Right edge
    pub fn max_x(&self) -> f32 {
        self.origin.x + self.size.x
    }

    /// Bottom edge
    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.y
    }

    /// Check if this rectangle contains a point (edges inclusive)
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min_x() && point.x <= self.max_x()
            && point.y >= self.min_y() && point.y <= self.max_y()
    }

    /// Check if this rectangle intersects another (touching edges count)
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x() <= other.max_x() && self.max_x() >= other.min_x()
            && self.min_y() <= other.max_y() && self.max_y() >= other.min_y()
    }

    /// Grow the rectangle by `amount` on every side
    pub fn inflate(&self, amount: Vec2) -> Self {
        Self {
            origin: self.origin - amount,
            size: self.size + amount * 2.0,
        }
    }
}

/// Common math utilities
pub mod utils {
    /// Linear interpolation between two values
    pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }

    /// Index of the pixel at (`x`, `y`) in a buffer with the given row pitch
    ///
    /// `pitch` is the row stride in bytes, so rows may be padded.
    pub fn pixel_index(x: usize, y: usize, pitch: usize, bytes_per_pixel: usize) -> usize {
        y * (pitch / bytes_per_pixel) + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(20.0, 20.0, 1.0, 1.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        // Touching edges intersect
        assert!(a.intersects(&Rect::new(10.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_rect_inflate() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0).inflate(Vec2::new(10.0, 5.0));
        assert_eq!(r, Rect::new(-10.0, -5.0, 120.0, 60.0));
    }

    #[test]
    fn test_pixel_index_uses_padded_pitch() {
        // 3 pixels wide, 4 bytes per pixel, rows padded to 16 bytes
        assert_eq!(utils::pixel_index(0, 1, 16, 4), 4);
        assert_eq!(utils::pixel_index(2, 2, 16, 4), 10);
    }
}
