//! Software rendering backend
//!
//! Renders into an in-memory RGBA framebuffer. Used for headless runs, image
//! export and tests; it is also the reference for how a backend is expected
//! to behave (clipping, alpha blending, lock discipline).

use std::path::Path;

use slotmap::SlotMap;

use crate::foundation::color::Color;
use crate::foundation::math::{utils, Rect, Vec2};
use crate::render::backend::{BackendError, BackendResult, PixelBuffer, RenderBackend, TextureHandle};

/// Texture rows are padded to this many bytes
const ROW_ALIGNMENT: usize = 16;

struct SoftwareTexture {
    width: u32,
    height: u32,
    pitch: usize,
    pixels: Vec<u32>,
    locked: bool,
}

impl SoftwareTexture {
    fn new(width: u32, height: u32) -> Self {
        let row_bytes = width as usize * PixelBuffer::BYTES_PER_PIXEL;
        let pitch = row_bytes.div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT;
        let stride = pitch / PixelBuffer::BYTES_PER_PIXEL;
        Self {
            width,
            height,
            pitch,
            pixels: vec![Color::TRANSPARENT.to_u32(); stride * height as usize],
            locked: false,
        }
    }

    fn pixel(&self, x: u32, y: u32) -> Color {
        let index = utils::pixel_index(x as usize, y as usize, self.pitch, PixelBuffer::BYTES_PER_PIXEL);
        Color::from_u32(self.pixels[index])
    }
}

/// Counters describing backend activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Primitive and blit calls since creation
    pub draw_calls: u64,
    /// Textures created (including loaded ones)
    pub textures_created: u64,
    /// Textures destroyed
    pub textures_destroyed: u64,
    /// Frames completed
    pub frames: u64,
}

/// CPU framebuffer backend
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    framebuffer: Vec<u32>,
    textures: SlotMap<TextureHandle, SoftwareTexture>,
    stats: BackendStats,
}

impl SoftwareBackend {
    /// Create a backend with a framebuffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        log::debug!("Creating software backend {}x{}", width, height);
        Self {
            width,
            height,
            framebuffer: vec![Color::BLACK.to_u32(); width as usize * height as usize],
            textures: SlotMap::with_key(),
            stats: BackendStats::default(),
        }
    }

    /// Read a framebuffer pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(Color::from_u32(self.framebuffer[(y * self.width + x) as usize]))
        } else {
            None
        }
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Check whether a texture handle is still alive
    pub fn has_texture(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(texture)
    }

    /// Activity counters
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Export the framebuffer as a PNG image
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        let bytes: Vec<u8> = self
            .framebuffer
            .iter()
            .flat_map(|packed| packed.to_be_bytes())
            .collect();
        image::save_buffer(path, &bytes, self.width, self.height, image::ExtendedColorType::Rgba8)
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let index = (y as usize) * self.width as usize + x as usize;
        let dst = Color::from_u32(self.framebuffer[index]);
        self.framebuffer[index] = color.blend_over(dst).to_u32();
    }

    fn fill_span(&mut self, x0: i64, x1: i64, y: i64, color: Color) {
        if !(0..i64::from(self.height)).contains(&y) {
            return;
        }
        if let Some((x0, x1)) = clip_range(x0, x1, self.width) {
            for x in x0..=x1 {
                self.blend_pixel(x, y, color);
            }
        }
    }

    fn fill_column(&mut self, x: i64, y0: i64, y1: i64, color: Color) {
        if !(0..i64::from(self.width)).contains(&x) {
            return;
        }
        if let Some((y0, y1)) = clip_range(y0, y1, self.height) {
            for y in y0..=y1 {
                self.blend_pixel(x, y, color);
            }
        }
    }
}

/// Clamp the inclusive range `lo..=hi` to `0..limit`
fn clip_range(lo: i64, hi: i64, limit: u32) -> Option<(i64, i64)> {
    let lo = lo.max(0);
    let hi = hi.min(i64::from(limit) - 1);
    (lo <= hi).then_some((lo, hi))
}

impl RenderBackend for SoftwareBackend {
    fn viewport_size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn begin_frame(&mut self, clear_color: Color) {
        self.framebuffer.fill(clear_color.to_u32());
    }

    fn end_frame(&mut self) {
        self.stats.frames += 1;
    }

    fn draw_pixel(&mut self, position: Vec2, color: Color) {
        self.stats.draw_calls += 1;
        self.blend_pixel(position.x.floor() as i64, position.y.floor() as i64, color);
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color) {
        self.stats.draw_calls += 1;

        // Bresenham
        let (mut x0, mut y0) = (from.x.round() as i64, from.y.round() as i64);
        let (x1, y1) = (to.x.round() as i64, to.y.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        // Both ends past the same edge: nothing to draw
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        if (x0 < 0 && x1 < 0) || (y0 < 0 && y1 < 0) || (x0 >= w && x1 >= w) || (y0 >= h && y1 >= h) {
            return;
        }

        loop {
            self.blend_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_ellipse(&mut self, center: Vec2, radii: Vec2, color: Color, filled: bool) {
        self.stats.draw_calls += 1;
        if radii.x <= 0.0 || radii.y <= 0.0 {
            return;
        }

        let inside = |x: f32, y: f32| {
            let nx = (x - center.x) / radii.x;
            let ny = (y - center.y) / radii.y;
            nx * nx + ny * ny <= 1.0
        };

        let rows = clip_range(
            (center.y - radii.y).floor() as i64,
            (center.y + radii.y).ceil() as i64,
            self.height,
        );
        let columns = clip_range(
            (center.x - radii.x).floor() as i64,
            (center.x + radii.x).ceil() as i64,
            self.width,
        );
        let (Some((min_y, max_y)), Some((min_x, max_x))) = (rows, columns) else {
            return;
        };

        for y in min_y..=max_y {
            let py = y as f32 + 0.5;
            if filled {
                // Pixel centres inside the ellipse on this row
                let ny = (py - center.y) / radii.y;
                if ny.abs() > 1.0 {
                    continue;
                }
                let half = radii.x * (1.0 - ny * ny).sqrt();
                let first = (center.x - half - 0.5).ceil() as i64;
                let last = (center.x + half - 0.5).floor() as i64;
                self.fill_span(first, last, y, color);
            } else {
                for x in min_x..=max_x {
                    let px = x as f32 + 0.5;
                    let on_edge = inside(px, py)
                        && (!inside(px - 1.0, py) || !inside(px + 1.0, py)
                            || !inside(px, py - 1.0) || !inside(px, py + 1.0));
                    if on_edge {
                        self.blend_pixel(x, y, color);
                    }
                }
            }
        }
    }

    fn draw_rect(&mut self, rect: Rect, color: Color, filled: bool) {
        if rect.size.x <= 0.0 || rect.size.y <= 0.0 {
            return;
        }
        let x0 = rect.min_x().round() as i64;
        let y0 = rect.min_y().round() as i64;
        let x1 = rect.max_x().round() as i64 - 1;
        let y1 = rect.max_y().round() as i64 - 1;

        self.stats.draw_calls += 1;
        if filled {
            if let Some((y0, y1)) = clip_range(y0, y1, self.height) {
                for y in y0..=y1 {
                    self.fill_span(x0, x1, y, color);
                }
            }
        } else {
            self.fill_span(x0, x1, y0, color);
            if y1 > y0 {
                self.fill_span(x0, x1, y1, color);
            }
            self.fill_column(x0, y0 + 1, y1 - 1, color);
            if x1 > x0 {
                self.fill_column(x1, y0 + 1, y1 - 1, color);
            }
        }
    }

    fn blit(&mut self, texture: TextureHandle, dest: Rect, source: Option<Rect>) -> BackendResult<()> {
        let tex = self.textures.get(texture).ok_or(BackendError::UnknownTexture(texture))?;
        if tex.locked {
            return Err(BackendError::TextureLocked(texture));
        }
        self.stats.draw_calls += 1;

        let source = source.unwrap_or_else(|| Rect::new(0.0, 0.0, tex.width as f32, tex.height as f32));
        if dest.size.x <= 0.0 || dest.size.y <= 0.0 || source.size.x <= 0.0 || source.size.y <= 0.0 {
            return Ok(());
        }

        let dst_w = dest.size.x.round() as i64;
        let dst_h = dest.size.y.round() as i64;
        let dst_x = dest.origin.x.round() as i64;
        let dst_y = dest.origin.y.round() as i64;
        let scale_x = source.size.x / dest.size.x;
        let scale_y = source.size.y / dest.size.y;

        // Only destination pixels inside the framebuffer are sampled
        let rows = clip_range(dst_y, dst_y.saturating_add(dst_h) - 1, self.height);
        let columns = clip_range(dst_x, dst_x.saturating_add(dst_w) - 1, self.width);
        let (Some((row0, row1)), Some((col0, col1))) = (rows, columns) else {
            return Ok(());
        };

        // Sample first, then blend, so the texture borrow ends before writing
        let mut samples = Vec::with_capacity(((row1 - row0 + 1) * (col1 - col0 + 1)) as usize);
        for dy in (row0 - dst_y)..=(row1 - dst_y) {
            for dx in (col0 - dst_x)..=(col1 - dst_x) {
                let sx = (source.origin.x + (dx as f32 + 0.5) * scale_x).floor();
                let sy = (source.origin.y + (dy as f32 + 0.5) * scale_y).floor();
                if sx < 0.0 || sy < 0.0 || sx >= tex.width as f32 || sy >= tex.height as f32 {
                    continue;
                }
                samples.push((dst_x + dx, dst_y + dy, tex.pixel(sx as u32, sy as u32)));
            }
        }

        for (x, y, color) in samples {
            self.blend_pixel(x, y, color);
        }
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32) -> BackendResult<TextureHandle> {
        if width == 0 || height == 0 {
            return Err(BackendError::InvalidSize { width, height });
        }
        self.stats.textures_created += 1;
        Ok(self.textures.insert(SoftwareTexture::new(width, height)))
    }

    fn load_texture(&mut self, path: &Path) -> BackendResult<TextureHandle> {
        let image = image::open(path).map_err(|e| BackendError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        let handle = self.create_texture(width, height)?;
        let mut buffer = self.lock_texture(handle)?;
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let [r, g, b, a] = pixel.0;
            buffer.set(x, y, Color::rgba(r, g, b, a));
        }
        self.unlock_texture(handle)?;

        log::debug!("Loaded texture {:?} ({}x{}) from {}", handle, width, height, path.display());
        Ok(handle)
    }

    fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(texture).map(|tex| (tex.width, tex.height))
    }

    fn lock_texture(&mut self, texture: TextureHandle) -> BackendResult<PixelBuffer<'_>> {
        let tex = self.textures.get_mut(texture).ok_or(BackendError::UnknownTexture(texture))?;
        if tex.locked {
            return Err(BackendError::AlreadyLocked(texture));
        }
        tex.locked = true;
        Ok(PixelBuffer {
            pixels: &mut tex.pixels,
            width: tex.width,
            height: tex.height,
            pitch: tex.pitch,
        })
    }

    fn unlock_texture(&mut self, texture: TextureHandle) -> BackendResult<()> {
        let tex = self.textures.get_mut(texture).ok_or(BackendError::UnknownTexture(texture))?;
        tex.locked = false;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(texture).is_some() {
            self.stats.textures_destroyed += 1;
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
