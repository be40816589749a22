//! Font rasterizer contract
//!
//! The glyph cache knows nothing about font files. It asks a
//! [`FontRasterizer`] for a coverage bitmap and metrics and does the rest
//! (tinting, upload, lifetime) itself.

use crate::foundation::math::Vec2;

/// Identifier of a font loaded into a rasterizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub u32);

bitflags::bitflags! {
    /// Style variations that produce a distinct glyph bitmap
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphStyle: u8 {
        /// Heavier strokes
        const BOLD = 1 << 0;
        /// Slanted
        const ITALIC = 1 << 1;
        /// Line under the glyph
        const UNDERLINE = 1 << 2;
        /// Line through the glyph
        const STRIKETHROUGH = 1 << 3;
    }
}

/// Placement of a glyph relative to the pen position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    /// Horizontal pen advance in pixels
    pub advance: f32,
    /// Offset of the bitmap's top-left corner from the pen position
    pub offset: Vec2,
}

/// 8-bit coverage bitmap of one glyph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphBitmap {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major coverage, `width * height` bytes
    pub coverage: Vec<u8>,
    /// Placement metrics
    pub metrics: GlyphMetrics,
}

impl GlyphBitmap {
    /// Coverage at (`x`, `y`), zero outside the bitmap
    pub fn coverage_at(&self, x: u32, y: u32) -> u8 {
        if x < self.width && y < self.height {
            let index = y as usize * self.width as usize + x as usize;
            self.coverage.get(index).copied().unwrap_or(0)
        } else {
            0
        }
    }

    /// Check that `coverage` holds at least `width * height` bytes
    pub fn is_well_formed(&self) -> bool {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .is_some_and(|needed| self.coverage.len() >= needed)
    }

    /// Check if the bitmap has no pixels (e.g. a space)
    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Errors raised while rasterizing
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RasterError {
    /// The font has no glyph for this character
    #[error("Font {font:?} has no glyph for {ch:?}")]
    UndefinedGlyph {
        /// Font queried
        font: FontId,
        /// Missing character
        ch: char,
    },

    /// The font id is not loaded
    #[error("Unknown font {0:?}")]
    UnknownFont(FontId),

    /// Font data could not be loaded
    #[error("Failed to load font: {0}")]
    LoadFailed(String),

    /// Any other rasterizer failure
    #[error("Failed to rasterize {ch:?}: {reason}")]
    Failed {
        /// Character being rasterized
        ch: char,
        /// Rasterizer message
        reason: String,
    },
}

/// Produces glyph coverage bitmaps
pub trait FontRasterizer {
    /// Rasterize one character
    fn rasterize(&self, font: FontId, ch: char, style: GlyphStyle) -> Result<GlyphBitmap, RasterError>;

    /// Distance between baselines, if the font is known
    fn line_height(&self, font: FontId) -> Option<f32>;
}

/// Apply synthetic style effects to a regular-weight bitmap
///
/// Bold dilates by one pixel, italic shears by a quarter of the height, and
/// underline/strikethrough add a full-coverage row.
pub fn apply_style(mut bitmap: GlyphBitmap, style: GlyphStyle) -> GlyphBitmap {
    if bitmap.is_blank() {
        return bitmap;
    }
    if style.contains(GlyphStyle::BOLD) {
        bitmap = embolden(&bitmap);
    }
    if style.contains(GlyphStyle::ITALIC) {
        bitmap = shear(&bitmap);
    }
    if style.contains(GlyphStyle::UNDERLINE) {
        let row = bitmap.height - 1;
        fill_row(&mut bitmap, row);
    }
    if style.contains(GlyphStyle::STRIKETHROUGH) {
        let row = bitmap.height / 2;
        fill_row(&mut bitmap, row);
    }
    bitmap
}

fn embolden(source: &GlyphBitmap) -> GlyphBitmap {
    let width = source.width + 1;
    let mut coverage = Vec::with_capacity((width * source.height) as usize);
    for y in 0..source.height {
        for x in 0..width {
            let left = if x > 0 { source.coverage_at(x - 1, y) } else { 0 };
            coverage.push(source.coverage_at(x, y).max(left));
        }
    }
    GlyphBitmap {
        width,
        height: source.height,
        coverage,
        metrics: GlyphMetrics {
            advance: source.metrics.advance + 1.0,
            offset: source.metrics.offset,
        },
    }
}

fn shear(source: &GlyphBitmap) -> GlyphBitmap {
    let slant = (source.height - 1) / 4;
    let width = source.width + slant;
    let mut coverage = vec![0; (width * source.height) as usize];
    for y in 0..source.height {
        let shift = (source.height - 1 - y) / 4;
        for x in 0..source.width {
            coverage[(y * width + x + shift) as usize] = source.coverage_at(x, y);
        }
    }
    GlyphBitmap {
        width,
        height: source.height,
        coverage,
        metrics: source.metrics,
    }
}

fn fill_row(bitmap: &mut GlyphBitmap, row: u32) {
    let start = (row * bitmap.width) as usize;
    let end = start + bitmap.width as usize;
    if let Some(pixels) = bitmap.coverage.get_mut(start..end) {
        pixels.fill(u8::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot() -> GlyphBitmap {
        // 2x4 with one lit pixel at (0, 0)
        let mut coverage = vec![0; 8];
        coverage[0] = 200;
        GlyphBitmap {
            width: 2,
            height: 4,
            coverage,
            metrics: GlyphMetrics {
                advance: 3.0,
                offset: Vec2::zeros(),
            },
        }
    }

    #[test]
    fn test_regular_style_is_unchanged() {
        assert_eq!(apply_style(dot(), GlyphStyle::empty()), dot());
    }

    #[test]
    fn test_bold_widens() {
        let bold = apply_style(dot(), GlyphStyle::BOLD);
        assert_eq!(bold.width, 3);
        assert_eq!(bold.coverage_at(0, 0), 200);
        assert_eq!(bold.coverage_at(1, 0), 200);
        assert_eq!(bold.coverage_at(2, 0), 0);
    }

    #[test]
    fn test_italic_shifts_top_rows() {
        let mut coverage = vec![0; 9];
        coverage[0] = 255;
        coverage[8] = 255;
        let tall = GlyphBitmap {
            width: 1,
            height: 9,
            coverage,
            metrics: GlyphMetrics::default(),
        };

        let italic = apply_style(tall, GlyphStyle::ITALIC);
        assert_eq!(italic.width, 3);
        assert_eq!(italic.coverage_at(2, 0), 255);
        assert_eq!(italic.coverage_at(0, 0), 0);
        assert_eq!(italic.coverage_at(0, 8), 255);
    }

    #[test]
    fn test_decorations_fill_rows() {
        let decorated = apply_style(dot(), GlyphStyle::UNDERLINE | GlyphStyle::STRIKETHROUGH);
        assert_eq!(decorated.coverage_at(1, 3), 255);
        assert_eq!(decorated.coverage_at(0, 2), 255);
        assert_eq!(decorated.coverage_at(1, 1), 0);
    }

    #[test]
    fn test_blank_bitmap_ignores_style() {
        let blank = GlyphBitmap::default();
        assert!(apply_style(blank.clone(), GlyphStyle::all()).is_blank());
    }

    #[test]
    fn test_short_coverage_reads_as_empty() {
        let short = GlyphBitmap {
            width: 4,
            height: 4,
            coverage: vec![9; 3],
            metrics: GlyphMetrics::default(),
        };
        assert!(!short.is_well_formed());
        assert!(dot().is_well_formed());
        assert_eq!(short.coverage_at(2, 0), 9);
        assert_eq!(short.coverage_at(3, 3), 0);
    }
}
