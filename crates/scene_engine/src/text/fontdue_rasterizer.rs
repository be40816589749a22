//! Font rasterizer backed by `fontdue`

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::foundation::math::Vec2;
use crate::text::rasterizer::{
    apply_style, FontId, FontRasterizer, GlyphBitmap, GlyphMetrics, GlyphStyle, RasterError,
};

struct LoadedFont {
    font: Font,
    size: f32,
}

/// Pure Rust TrueType/OpenType rasterizer
///
/// Fonts are loaded at a fixed pixel size and addressed by [`FontId`]. Bold,
/// italic and line decorations are synthesized from the regular outline.
#[derive(Default)]
pub struct FontdueRasterizer {
    fonts: HashMap<FontId, LoadedFont>,
    next_id: u32,
}

impl FontdueRasterizer {
    /// Create a rasterizer with no fonts
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font from TTF/OTF bytes at `size` pixels
    pub fn load_font(&mut self, font_data: &[u8], size: f32) -> Result<FontId, RasterError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(RasterError::LoadFailed(format!("invalid font size {size}")));
        }
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| RasterError::LoadFailed(format!("fontdue error: {e}")))?;

        let id = FontId(self.next_id);
        self.next_id += 1;
        self.fonts.insert(id, LoadedFont { font, size });

        log::info!("Loaded font {:?} at {}px", id, size);
        Ok(id)
    }

    /// Load a font file
    pub fn load_font_file(&mut self, path: impl AsRef<Path>, size: f32) -> Result<FontId, RasterError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| RasterError::LoadFailed(format!("{}: {e}", path.display())))?;
        self.load_font(&bytes, size)
    }

    /// Unload a font; cached glyphs of it should be dropped with
    /// [`crate::text::GlyphCache::delete_font`]
    pub fn unload_font(&mut self, font: FontId) -> bool {
        self.fonts.remove(&font).is_some()
    }

    /// Pixel size a font was loaded at
    pub fn font_size(&self, font: FontId) -> Option<f32> {
        self.fonts.get(&font).map(|loaded| loaded.size)
    }

    /// Number of loaded fonts
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }
}

impl FontRasterizer for FontdueRasterizer {
    fn rasterize(&self, font: FontId, ch: char, style: GlyphStyle) -> Result<GlyphBitmap, RasterError> {
        let loaded = self.fonts.get(&font).ok_or(RasterError::UnknownFont(font))?;

        // Index 0 is the font's .notdef glyph
        if loaded.font.lookup_glyph_index(ch) == 0 && !ch.is_whitespace() {
            return Err(RasterError::UndefinedGlyph { font, ch });
        }

        let (metrics, coverage) = loaded.font.rasterize(ch, loaded.size);
        let bitmap = GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            coverage,
            metrics: GlyphMetrics {
                advance: metrics.advance_width,
                // fontdue measures ymin up from the baseline; offsets here are
                // from the baseline pen position down to the bitmap's top row
                offset: Vec2::new(
                    metrics.xmin as f32,
                    -(metrics.height as f32 + metrics.ymin as f32),
                ),
            },
        };
        Ok(apply_style(bitmap, style))
    }

    fn line_height(&self, font: FontId) -> Option<f32> {
        let loaded = self.fonts.get(&font)?;
        Some(
            loaded
                .font
                .horizontal_line_metrics(loaded.size)
                .map_or(loaded.size, |line| line.new_line_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_font_data_is_rejected() {
        let mut rasterizer = FontdueRasterizer::new();
        let result = rasterizer.load_font(b"not a font", 16.0);
        assert!(matches!(result, Err(RasterError::LoadFailed(_))));
        assert_eq!(rasterizer.font_count(), 0);
    }

    #[test]
    fn test_invalid_size_is_rejected() {
        let mut rasterizer = FontdueRasterizer::new();
        assert!(rasterizer.load_font(&[], 0.0).is_err());
    }

    #[test]
    fn test_missing_file() {
        let mut rasterizer = FontdueRasterizer::new();
        let result = rasterizer.load_font_file("/nonexistent/font.ttf", 16.0);
        assert!(matches!(result, Err(RasterError::LoadFailed(_))));
    }

    #[test]
    fn test_unknown_font() {
        let rasterizer = FontdueRasterizer::new();
        assert_eq!(
            rasterizer.rasterize(FontId(4), 'a', GlyphStyle::empty()),
            Err(RasterError::UnknownFont(FontId(4)))
        );
        assert_eq!(rasterizer.line_height(FontId(4)), None);
    }
}
