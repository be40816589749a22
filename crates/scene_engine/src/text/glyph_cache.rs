//! Glyph cache
//!
//! Lazily rasterizes `(font, character, color, style)` combinations into
//! backend textures and evicts whatever was not drawn during the last frame.
//!
//! Every [`GlyphCache::query`] marks its entry as used. The renderer calls
//! [`GlyphCache::purge_unused`] once per frame after all drawing, which
//! releases every unmarked entry and clears the mark on the rest.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::foundation::color::Color;
use crate::foundation::math::Vec2;
use crate::render::backend::{BackendResult, RenderBackend, TextureHandle};
use crate::text::rasterizer::{FontId, FontRasterizer, GlyphBitmap, GlyphMetrics, GlyphStyle, RasterError};

/// Cache key: one distinct glyph bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    /// Font the glyph comes from
    pub font: FontId,
    /// Character
    pub ch: char,
    /// Foreground color baked into the texture
    pub color: Color,
    /// Style flags
    pub style: GlyphStyle,
}

impl GlyphKey {
    /// Create a key
    pub fn new(font: FontId, ch: char, color: Color, style: GlyphStyle) -> Self {
        Self { font, ch, color, style }
    }
}

/// A cached glyph
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphEntry {
    /// Texture holding the tinted bitmap; `None` for blank glyphs and placeholders
    pub texture: Option<TextureHandle>,
    /// Bitmap size in pixels
    pub size: Vec2,
    /// Placement metrics
    pub metrics: GlyphMetrics,
    placeholder: bool,
    used: bool,
}

impl GlyphEntry {
    fn placeholder() -> Self {
        Self {
            texture: None,
            size: Vec2::zeros(),
            metrics: GlyphMetrics::default(),
            placeholder: true,
            used: false,
        }
    }

    /// Check if this entry stands in for a glyph that failed to rasterize
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Check if the entry was queried since the last purge
    pub fn is_used(&self) -> bool {
        self.used
    }
}

/// Cache activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphCacheStats {
    /// Queries answered from the cache
    pub hits: u64,
    /// Queries that created an entry
    pub misses: u64,
    /// Calls into the rasterizer (fallback retries included)
    pub rasterizations: u64,
    /// Entries released by purges
    pub evictions: u64,
    /// Placeholder entries created
    pub placeholders: u64,
}

/// Per-frame glyph texture cache
pub struct GlyphCache {
    entries: HashMap<GlyphKey, GlyphEntry>,
    fallback: char,
    reported: HashSet<(FontId, char)>,
    stats: GlyphCacheStats,
}

impl GlyphCache {
    /// Create an empty cache using `fallback` for undefined characters
    pub fn new(fallback: char) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
            reported: HashSet::new(),
            stats: GlyphCacheStats::default(),
        }
    }

    /// Fallback character
    pub fn fallback(&self) -> char {
        self.fallback
    }

    /// Look up a glyph, rasterizing and uploading it on a miss
    ///
    /// Always returns an entry: failures are cached as placeholders so a bad
    /// glyph is not retried every frame.
    pub fn query(
        &mut self,
        key: GlyphKey,
        fonts: &dyn FontRasterizer,
        backend: &mut dyn RenderBackend,
    ) -> &GlyphEntry {
        let entry = match self.entries.entry(key) {
            Entry::Occupied(occupied) => {
                self.stats.hits += 1;
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => {
                self.stats.misses += 1;
                let entry = Self::create_entry(
                    key,
                    self.fallback,
                    fonts,
                    backend,
                    &mut self.stats,
                    &mut self.reported,
                );
                vacant.insert(entry)
            }
        };
        entry.used = true;
        entry
    }

    fn create_entry(
        key: GlyphKey,
        fallback: char,
        fonts: &dyn FontRasterizer,
        backend: &mut dyn RenderBackend,
        stats: &mut GlyphCacheStats,
        reported: &mut HashSet<(FontId, char)>,
    ) -> GlyphEntry {
        stats.rasterizations += 1;
        let mut result = fonts.rasterize(key.font, key.ch, key.style);

        if matches!(result, Err(RasterError::UndefinedGlyph { .. })) && key.ch != fallback {
            stats.rasterizations += 1;
            result = fonts.rasterize(key.font, fallback, key.style);
        }

        let bitmap = match result {
            Ok(bitmap) => bitmap,
            Err(RasterError::UndefinedGlyph { .. }) => {
                if reported.insert((key.font, key.ch)) {
                    log::warn!(
                        "No glyph for {:?} or fallback {:?} in font {:?}; drawing nothing",
                        key.ch,
                        fallback,
                        key.font
                    );
                }
                stats.placeholders += 1;
                return GlyphEntry::placeholder();
            }
            Err(err) => {
                log::error!("Glyph rasterization failed: {}", err);
                stats.placeholders += 1;
                return GlyphEntry::placeholder();
            }
        };

        if !bitmap.is_well_formed() {
            log::error!(
                "Glyph {:?} in font {:?} is {}x{} but carries {} coverage bytes",
                key.ch,
                key.font,
                bitmap.width,
                bitmap.height,
                bitmap.coverage.len()
            );
            stats.placeholders += 1;
            return GlyphEntry::placeholder();
        }

        match upload(&bitmap, key.color, backend) {
            Ok(texture) => GlyphEntry {
                texture,
                size: Vec2::new(bitmap.width as f32, bitmap.height as f32),
                metrics: bitmap.metrics,
                placeholder: false,
                used: false,
            },
            Err(err) => {
                log::error!("Failed to upload glyph {:?}: {}", key.ch, err);
                stats.placeholders += 1;
                GlyphEntry::placeholder()
            }
        }
    }

    /// Look up without rasterizing or marking
    pub fn get(&self, key: &GlyphKey) -> Option<&GlyphEntry> {
        self.entries.get(key)
    }

    /// Check for an entry
    pub fn contains(&self, key: &GlyphKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Activity counters
    pub fn stats(&self) -> GlyphCacheStats {
        self.stats
    }

    /// Remove one entry and release its texture
    pub fn delete_entry(&mut self, key: &GlyphKey, backend: &mut dyn RenderBackend) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                release(&entry, backend);
                true
            }
            None => false,
        }
    }

    /// Remove every entry of a font, e.g. after it is unloaded
    pub fn delete_font(&mut self, font: FontId, backend: &mut dyn RenderBackend) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            if key.font == font {
                release(entry, backend);
                false
            } else {
                true
            }
        });
        self.reported.retain(|(reported_font, _)| *reported_font != font);
        before - self.entries.len()
    }

    /// Release every entry
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (_, entry) in self.entries.drain() {
            release(&entry, backend);
        }
        log::debug!("Glyph cache cleared");
    }

    /// Evict entries not queried since the last purge
    ///
    /// Returns the number of evicted entries.
    pub fn purge_unused(&mut self, backend: &mut dyn RenderBackend) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            if entry.used {
                entry.used = false;
                true
            } else {
                release(entry, backend);
                false
            }
        });

        let evicted = before - self.entries.len();
        self.stats.evictions += evicted as u64;
        if evicted > 0 {
            log::trace!("Evicted {} glyphs, {} remain", evicted, self.entries.len());
        }
        evicted
    }
}

fn release(entry: &GlyphEntry, backend: &mut dyn RenderBackend) {
    if let Some(texture) = entry.texture {
        backend.destroy_texture(texture);
    }
}

/// Tint a coverage bitmap and copy it into a new texture
fn upload(bitmap: &GlyphBitmap, color: Color, backend: &mut dyn RenderBackend) -> BackendResult<Option<TextureHandle>> {
    if bitmap.is_blank() {
        return Ok(None);
    }

    let texture = backend.create_texture(bitmap.width, bitmap.height)?;
    if let Err(err) = fill_texture(texture, bitmap, color, backend) {
        backend.destroy_texture(texture);
        return Err(err);
    }
    Ok(Some(texture))
}

fn fill_texture(
    texture: TextureHandle,
    bitmap: &GlyphBitmap,
    color: Color,
    backend: &mut dyn RenderBackend,
) -> BackendResult<()> {
    let mut pixels = backend.lock_texture(texture)?;
    for y in 0..bitmap.height {
        for x in 0..bitmap.width {
            pixels.set(x, y, color.with_coverage(bitmap.coverage_at(x, y)));
        }
    }
    backend.unlock_texture(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::software::SoftwareBackend;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    const FONT: FontId = FontId(0);

    /// Rasterizer producing 2x3 solid bitmaps for ASCII letters and '?'
    struct CountingRasterizer {
        calls: Cell<u32>,
        fallback_defined: bool,
    }

    impl CountingRasterizer {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                fallback_defined: true,
            }
        }
    }

    impl FontRasterizer for CountingRasterizer {
        fn rasterize(&self, font: FontId, ch: char, _style: GlyphStyle) -> Result<GlyphBitmap, RasterError> {
            self.calls.set(self.calls.get() + 1);
            if font != FONT {
                return Err(RasterError::UnknownFont(font));
            }
            let defined = ch.is_ascii_alphabetic() || (ch == '?' && self.fallback_defined);
            if ch == ' ' {
                return Ok(GlyphBitmap {
                    metrics: GlyphMetrics {
                        advance: 2.0,
                        offset: Vec2::zeros(),
                    },
                    ..GlyphBitmap::default()
                });
            }
            if !defined {
                return Err(RasterError::UndefinedGlyph { font, ch });
            }
            Ok(GlyphBitmap {
                width: 2,
                height: 3,
                coverage: vec![255; 6],
                metrics: GlyphMetrics {
                    advance: 3.0,
                    offset: Vec2::new(0.0, -3.0),
                },
            })
        }

        fn line_height(&self, _font: FontId) -> Option<f32> {
            Some(4.0)
        }
    }

    fn key(ch: char) -> GlyphKey {
        GlyphKey::new(FONT, ch, Color::RED, GlyphStyle::empty())
    }

    #[test]
    fn test_repeat_queries_rasterize_once() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let first = *cache.query(key('a'), &fonts, &mut backend);
        for _ in 0..4 {
            let again = *cache.query(key('a'), &fonts, &mut backend);
            assert_eq!(again.texture, first.texture);
        }

        assert_eq!(fonts.calls.get(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().hits, 4);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(backend.texture_count(), 1);
    }

    #[test]
    fn test_texture_is_tinted() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let texture = cache.query(key('a'), &fonts, &mut backend).texture.unwrap();
        let pixels = backend.lock_texture(texture).unwrap();
        assert_eq!(pixels.get(1, 2), Some(Color::RED));
    }

    #[test]
    fn test_distinct_colors_are_distinct_entries() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        cache.query(key('a'), &fonts, &mut backend);
        cache.query(GlyphKey::new(FONT, 'a', Color::BLUE, GlyphStyle::empty()), &fonts, &mut backend);
        cache.query(GlyphKey::new(FONT, 'a', Color::RED, GlyphStyle::BOLD), &fonts, &mut backend);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_unused_entries_are_evicted() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let a = cache.query(key('a'), &fonts, &mut backend).texture.unwrap();
        let b = cache.query(key('b'), &fonts, &mut backend).texture.unwrap();
        assert_eq!(cache.purge_unused(&mut backend), 0);

        // Next frame only 'a' is drawn
        cache.query(key('a'), &fonts, &mut backend);
        assert_eq!(cache.purge_unused(&mut backend), 1);

        assert!(cache.contains(&key('a')));
        assert!(!cache.contains(&key('b')));
        assert!(backend.has_texture(a));
        assert!(!backend.has_texture(b));
        assert!(!cache.get(&key('a')).unwrap().is_used());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_evicted_glyph_is_rasterized_again() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        cache.query(key('a'), &fonts, &mut backend);
        cache.purge_unused(&mut backend);
        cache.purge_unused(&mut backend);
        assert!(cache.is_empty());

        cache.query(key('a'), &fonts, &mut backend);
        assert_eq!(fonts.calls.get(), 2);
    }

    #[test]
    fn test_undefined_glyph_uses_fallback() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let entry = *cache.query(key('1'), &fonts, &mut backend);
        assert!(!entry.is_placeholder());
        assert!(entry.texture.is_some());
        assert_eq!(fonts.calls.get(), 2);
        assert_eq!(cache.stats().rasterizations, 2);
    }

    #[test]
    fn test_missing_fallback_caches_placeholder() {
        let fonts = CountingRasterizer {
            fallback_defined: false,
            ..CountingRasterizer::new()
        };
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let entry = *cache.query(key('1'), &fonts, &mut backend);
        assert!(entry.is_placeholder());
        assert_eq!(entry.texture, None);

        cache.query(key('1'), &fonts, &mut backend);
        assert_eq!(fonts.calls.get(), 2);
        assert_eq!(cache.stats().placeholders, 1);
        assert_eq!(backend.texture_count(), 0);
    }

    #[test]
    fn test_unknown_font_caches_placeholder() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let entry = *cache.query(GlyphKey::new(FontId(9), 'a', Color::RED, GlyphStyle::empty()), &fonts, &mut backend);
        assert!(entry.is_placeholder());
        assert_eq!(fonts.calls.get(), 1);
    }

    /// Rasterizer whose bitmaps claim more pixels than they carry
    struct TruncatingRasterizer;

    impl FontRasterizer for TruncatingRasterizer {
        fn rasterize(&self, _font: FontId, _ch: char, _style: GlyphStyle) -> Result<GlyphBitmap, RasterError> {
            Ok(GlyphBitmap {
                width: 4,
                height: 4,
                coverage: vec![255; 3],
                metrics: GlyphMetrics::default(),
            })
        }

        fn line_height(&self, _font: FontId) -> Option<f32> {
            Some(4.0)
        }
    }

    #[test]
    fn test_truncated_bitmap_caches_placeholder() {
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let entry = *cache.query(key('a'), &TruncatingRasterizer, &mut backend);
        assert!(entry.is_placeholder());
        assert_eq!(entry.texture, None);
        assert_eq!(backend.texture_count(), 0);
        assert_eq!(cache.stats().placeholders, 1);

        // Cached: a second query does not retry
        cache.query(key('a'), &TruncatingRasterizer, &mut backend);
        assert_eq!(cache.stats().rasterizations, 1);
    }

    #[test]
    fn test_blank_glyph_keeps_metrics() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        let space = *cache.query(key(' '), &fonts, &mut backend);
        assert!(!space.is_placeholder());
        assert_eq!(space.texture, None);
        assert_relative_eq!(space.metrics.advance, 2.0);
    }

    #[test]
    fn test_delete_and_clear_release_textures() {
        let fonts = CountingRasterizer::new();
        let mut backend = SoftwareBackend::new(16, 16);
        let mut cache = GlyphCache::new('?');

        for ch in ['a', 'b', 'c'] {
            cache.query(key(ch), &fonts, &mut backend);
        }
        assert!(cache.delete_entry(&key('a'), &mut backend));
        assert!(!cache.delete_entry(&key('a'), &mut backend));
        assert_eq!(backend.texture_count(), 2);

        assert_eq!(cache.delete_font(FontId(3), &mut backend), 0);
        assert_eq!(cache.delete_font(FONT, &mut backend), 2);
        assert_eq!(backend.texture_count(), 0);

        cache.query(key('d'), &fonts, &mut backend);
        cache.clear(&mut backend);
        assert!(cache.is_empty());
        assert_eq!(backend.texture_count(), 0);
    }
}
