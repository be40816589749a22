//! Text rendering support: rasterizer contract and glyph cache

pub mod fontdue_rasterizer;
pub mod glyph_cache;
pub mod rasterizer;

pub use fontdue_rasterizer::FontdueRasterizer;
pub use glyph_cache::{GlyphCache, GlyphCacheStats, GlyphEntry, GlyphKey};
pub use rasterizer::{apply_style, FontId, FontRasterizer, GlyphBitmap, GlyphMetrics, GlyphStyle, RasterError};
