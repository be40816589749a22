//! Backend abstraction traits for the rendering system
//!
//! The scene core never rasterizes anything itself. Everything it draws goes
//! through the primitive operations and texture lifecycle defined here.

use std::path::Path;

use crate::foundation::color::Color;
use crate::foundation::math::{Rect, Vec2};

slotmap::new_key_type! {
    /// Handle to a texture owned by a rendering backend
    pub struct TextureHandle;
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by rendering backends
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The handle does not refer to a live texture
    #[error("Unknown texture handle {0:?}")]
    UnknownTexture(TextureHandle),

    /// Texture is already locked for pixel access
    #[error("Texture {0:?} is already locked")]
    AlreadyLocked(TextureHandle),

    /// Operation requires an unlocked texture
    #[error("Texture {0:?} is locked")]
    TextureLocked(TextureHandle),

    /// Texture dimensions are unusable
    #[error("Invalid texture size {width}x{height}")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Failed to load or decode an image file
    #[error("Failed to load texture from '{path}': {reason}")]
    LoadFailed {
        /// Path that was requested
        path: String,
        /// Decoder or IO message
        reason: String,
    },
}

/// Locked pixel storage of a texture
///
/// Pixels are packed RGBA (`0xRRGGBBAA`). `pitch` is the row stride in bytes
/// and may be larger than `width * 4`, so address pixels through
/// [`PixelBuffer::index`] rather than `y * width + x`.
pub struct PixelBuffer<'a> {
    /// Packed pixel data
    pub pixels: &'a mut [u32],
    /// Texture width in pixels
    pub width: u32,
    /// Texture height in pixels
    pub height: u32,
    /// Row stride in bytes
    pub pitch: usize,
}

impl PixelBuffer<'_> {
    /// Bytes per packed pixel
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Index of pixel (`x`, `y`) in [`Self::pixels`]
    pub fn index(&self, x: u32, y: u32) -> usize {
        crate::foundation::math::utils::pixel_index(
            x as usize,
            y as usize,
            self.pitch,
            Self::BYTES_PER_PIXEL,
        )
    }

    /// Write a pixel; out-of-bounds writes are ignored
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.pixels[index] = color.to_u32();
        }
    }

    /// Read a pixel
    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(Color::from_u32(self.pixels[self.index(x, y)]))
        } else {
            None
        }
    }
}

/// Main rendering backend trait
///
/// Implemented by whatever actually puts pixels somewhere (a GPU renderer, a
/// software framebuffer, a recording stub in tests).
pub trait RenderBackend {
    /// Size of the drawable area in pixels
    fn viewport_size(&self) -> Vec2;

    /// Called by the renderer before the first draw of a frame
    fn begin_frame(&mut self, _clear_color: Color) {}

    /// Called by the renderer after the last draw of a frame
    fn end_frame(&mut self) {}

    /// Plot a single pixel
    fn draw_pixel(&mut self, position: Vec2, color: Color);

    /// Draw a one pixel wide line
    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color);

    /// Draw an axis-aligned ellipse
    fn draw_ellipse(&mut self, center: Vec2, radii: Vec2, color: Color, filled: bool);

    /// Draw a rectangle outline or filled rectangle
    fn draw_rect(&mut self, rect: Rect, color: Color, filled: bool);

    /// Copy a texture (or the `source` sub-rectangle of it) into `dest`
    fn blit(&mut self, texture: TextureHandle, dest: Rect, source: Option<Rect>) -> BackendResult<()>;

    /// Create a blank, fully transparent texture
    fn create_texture(&mut self, width: u32, height: u32) -> BackendResult<TextureHandle>;

    /// Load a texture from an image file
    fn load_texture(&mut self, path: &Path) -> BackendResult<TextureHandle>;

    /// Size of a texture in pixels
    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)>;

    /// Lock a texture for direct pixel access
    fn lock_texture(&mut self, texture: TextureHandle) -> BackendResult<PixelBuffer<'_>>;

    /// Release a lock taken with [`RenderBackend::lock_texture`]
    fn unlock_texture(&mut self, texture: TextureHandle) -> BackendResult<()>;

    /// Destroy a texture and release its storage
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to the concrete backend type mutably
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
