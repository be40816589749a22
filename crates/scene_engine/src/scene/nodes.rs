//! Built-in node behaviors: shapes, sprites and text labels

use std::any::Any;
use std::path::Path;

use crate::animation::registry::{expect_bool, expect_f32, expect_i32, PropertyError, PropertySetter};
use crate::animation::value::Value;
use crate::foundation::color::Color;
use crate::foundation::math::{Rect, Vec2};
use crate::render::backend::{RenderBackend, TextureHandle};
use crate::scene::behavior::{Behavior, DrawContext};
use crate::scene::renderable::Renderable;
use crate::text::glyph_cache::GlyphKey;
use crate::text::rasterizer::{FontId, GlyphStyle};

/// Primitive drawn by a [`Shape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Axis-aligned rectangle filling the node's box
    Rectangle,
    /// Ellipse inscribed in the node's box
    Ellipse,
    /// Line from the node's position to position + size
    Line,
    /// Single pixel at the node's position
    Pixel,
}

/// Primitive shape
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// What to draw
    pub kind: ShapeKind,
    /// Stroke or fill color
    pub color: Color,
    /// Fill instead of outlining (rectangles and ellipses)
    pub filled: bool,
    /// Outline width in pixels
    pub thickness: f32,
}

fn set_shape_filled(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    let filled = expect_bool("filled", value)?;
    shape_mut(node, "filled")?.filled = filled;
    Ok(())
}

fn set_shape_thickness(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    let thickness = expect_f32("thickness", value)?;
    shape_mut(node, "thickness")?.thickness = thickness.max(0.0);
    Ok(())
}

fn shape_mut<'a>(node: &'a mut Renderable, property: &'static str) -> Result<&'a mut Shape, PropertyError> {
    node.downcast_mut::<Shape>().ok_or(PropertyError::MissingBehavior {
        property,
        type_name: "Shape",
    })
}

const SHAPE_PROPERTIES: &[(&str, PropertySetter)] = &[
    ("filled", set_shape_filled),
    ("thickness", set_shape_thickness),
];

impl Shape {
    /// Create a shape
    pub fn new(kind: ShapeKind, color: Color, filled: bool) -> Self {
        Self {
            kind,
            color,
            filled,
            thickness: 1.0,
        }
    }

    /// Rectangle
    pub fn rect(color: Color, filled: bool) -> Self {
        Self::new(ShapeKind::Rectangle, color, filled)
    }

    /// Ellipse
    pub fn ellipse(color: Color, filled: bool) -> Self {
        Self::new(ShapeKind::Ellipse, color, filled)
    }

    /// Line
    pub fn line(color: Color) -> Self {
        Self::new(ShapeKind::Line, color, false)
    }

    /// Pixel
    pub fn pixel(color: Color) -> Self {
        Self::new(ShapeKind::Pixel, color, false)
    }

    /// Set outline width (builder pattern)
    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness.max(0.0);
        self
    }

    /// Draw into `bounds`
    pub fn paint(&self, bounds: Rect, backend: &mut dyn RenderBackend) {
        let strokes = (self.thickness.round() as u32).max(1);
        match self.kind {
            ShapeKind::Rectangle if self.filled => backend.draw_rect(bounds, self.color, true),
            ShapeKind::Rectangle => {
                for i in 0..strokes {
                    let inset = bounds.inflate(Vec2::repeat(-(i as f32)));
                    if inset.size.x < 0.0 || inset.size.y < 0.0 {
                        break;
                    }
                    backend.draw_rect(inset, self.color, false);
                }
            }
            ShapeKind::Ellipse => {
                let center = bounds.origin + bounds.size * 0.5;
                let radii = bounds.size * 0.5;
                if self.filled {
                    backend.draw_ellipse(center, radii, self.color, true);
                } else {
                    for i in 0..strokes {
                        let inner = radii - Vec2::repeat(i as f32);
                        if inner.x < 0.0 || inner.y < 0.0 {
                            break;
                        }
                        backend.draw_ellipse(center, inner, self.color, false);
                    }
                }
            }
            ShapeKind::Line => {
                let from = bounds.origin;
                let to = bounds.origin + bounds.size;
                let direction = to - from;
                let normal = match direction.try_normalize(f32::EPSILON) {
                    Some(unit) => Vec2::new(-unit.y, unit.x),
                    None => Vec2::zeros(),
                };
                for i in 0..strokes {
                    let offset = normal * (i as f32 - (strokes - 1) as f32 / 2.0);
                    backend.draw_line(from + offset, to + offset, self.color);
                }
            }
            ShapeKind::Pixel => backend.draw_pixel(bounds.origin, self.color),
        }
    }
}

impl Behavior for Shape {
    fn type_name(&self) -> &'static str {
        "Shape"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn properties(&self) -> &'static [(&'static str, PropertySetter)] {
        SHAPE_PROPERTIES
    }

    fn draw(&mut self, node: &Renderable, ctx: &mut DrawContext<'_>) {
        self.paint(node.render_bounds(), ctx.backend);
    }
}

/// Textured quad, optionally one frame of a sprite sheet
///
/// A sprite whose texture is missing (never loaded, or failed to load) skips
/// drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    texture: Option<TextureHandle>,
    owns_texture: bool,
    /// Explicit source rectangle; ignored when a frame size is set
    pub source: Option<Rect>,
    /// Sprite sheet cell size
    pub frame_size: Option<Vec2>,
    /// Sprite sheet cell index, row-major
    pub frame: i32,
}

fn set_sprite_frame(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    let frame = expect_i32("frame", value)?;
    let sprite = node.downcast_mut::<Sprite>().ok_or(PropertyError::MissingBehavior {
        property: "frame",
        type_name: "Sprite",
    })?;
    sprite.frame = frame;
    Ok(())
}

const SPRITE_PROPERTIES: &[(&str, PropertySetter)] = &[("frame", set_sprite_frame)];

impl Sprite {
    /// Sprite drawing a texture owned elsewhere
    pub fn new(texture: TextureHandle) -> Self {
        Self {
            texture: Some(texture),
            owns_texture: false,
            source: None,
            frame_size: None,
            frame: 0,
        }
    }

    /// Load the texture from an image file
    ///
    /// On failure the error is logged and the sprite draws nothing. The
    /// loaded texture is released when the node is removed.
    pub fn from_file(path: impl AsRef<Path>, backend: &mut dyn RenderBackend) -> Self {
        let path = path.as_ref();
        let texture = match backend.load_texture(path) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::warn!("Sprite texture unavailable: {}", err);
                None
            }
        };
        Self {
            texture,
            owns_texture: texture.is_some(),
            source: None,
            frame_size: None,
            frame: 0,
        }
    }

    /// Use part of the texture (builder pattern)
    pub fn with_source(mut self, source: Rect) -> Self {
        self.source = Some(source);
        self
    }

    /// Treat the texture as a grid of `width` x `height` cells (builder pattern)
    pub fn with_frames(mut self, width: f32, height: f32) -> Self {
        self.frame_size = Some(Vec2::new(width, height));
        self
    }

    /// Texture being drawn
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Source rectangle for the current frame
    fn source_rect(&self, texture_size: (u32, u32)) -> Option<Rect> {
        let Some(cell) = self.frame_size else {
            return self.source;
        };
        if cell.x <= 0.0 || cell.y <= 0.0 {
            return self.source;
        }

        let columns = ((texture_size.0 as f32 / cell.x).floor() as i32).max(1);
        let rows = ((texture_size.1 as f32 / cell.y).floor() as i32).max(1);
        let frame = self.frame.rem_euclid(columns * rows);
        Some(Rect::new(
            (frame % columns) as f32 * cell.x,
            (frame / columns) as f32 * cell.y,
            cell.x,
            cell.y,
        ))
    }
}

impl Behavior for Sprite {
    fn type_name(&self) -> &'static str {
        "Sprite"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn properties(&self) -> &'static [(&'static str, PropertySetter)] {
        SPRITE_PROPERTIES
    }

    fn on_destroy(&mut self, _node: &Renderable, backend: &mut dyn RenderBackend) {
        if !self.owns_texture {
            return;
        }
        if let Some(texture) = self.texture.take() {
            backend.destroy_texture(texture);
        }
    }

    fn draw(&mut self, node: &Renderable, ctx: &mut DrawContext<'_>) {
        let Some(texture) = self.texture else { return };
        let Some(texture_size) = ctx.backend.texture_size(texture) else {
            log::warn!("Sprite '{}' lost its texture", node.name);
            self.texture = None;
            return;
        };

        let source = self.source_rect(texture_size);
        if let Err(err) = ctx.backend.blit(texture, node.render_bounds(), source) {
            log::warn!("Failed to draw sprite '{}': {}", node.name, err);
        }
    }
}

/// Single-font text
///
/// Glyphs come from the renderer's glyph cache, so a label only rasterizes
/// characters the cache does not already hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Text; `\n` starts a new line
    pub text: String,
    /// Font
    pub font: FontId,
    /// Text color
    pub color: Color,
    /// Style flags
    pub style: GlyphStyle,
    /// Extra pixels between characters
    pub letter_spacing: f32,
    /// Box drawn behind the text, filling the node's bounds
    pub background: Option<Shape>,
}

fn set_label_letter_spacing(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    let spacing = expect_f32("letter_spacing", value)?;
    let label = node.downcast_mut::<Label>().ok_or(PropertyError::MissingBehavior {
        property: "letter_spacing",
        type_name: "Label",
    })?;
    label.letter_spacing = spacing;
    Ok(())
}

const LABEL_PROPERTIES: &[(&str, PropertySetter)] = &[("letter_spacing", set_label_letter_spacing)];

impl Label {
    /// Create a label
    pub fn new(text: impl Into<String>, font: FontId, color: Color) -> Self {
        Self {
            text: text.into(),
            font,
            color,
            style: GlyphStyle::empty(),
            letter_spacing: 0.0,
            background: None,
        }
    }

    /// Set style flags (builder pattern)
    pub fn with_style(mut self, style: GlyphStyle) -> Self {
        self.style = style;
        self
    }

    /// Set a background box (builder pattern)
    pub fn with_background(mut self, background: Shape) -> Self {
        self.background = Some(background);
        self
    }
}

impl Behavior for Label {
    fn type_name(&self) -> &'static str {
        "Label"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn properties(&self) -> &'static [(&'static str, PropertySetter)] {
        LABEL_PROPERTIES
    }

    fn draw_components(&mut self, node: &Renderable, ctx: &mut DrawContext<'_>) {
        if let Some(background) = &self.background {
            background.paint(node.render_bounds(), ctx.backend);
        }
    }

    fn draw(&mut self, node: &Renderable, ctx: &mut DrawContext<'_>) {
        let Some(line_height) = ctx.fonts.line_height(self.font) else {
            log::warn!("Label '{}' uses unknown font {:?}", node.name, self.font);
            return;
        };

        let origin = node.render_position();
        let mut pen = Vec2::new(origin.x, origin.y + line_height);
        for ch in self.text.chars() {
            if ch == '\n' {
                pen = Vec2::new(origin.x, pen.y + line_height);
                continue;
            }

            let key = GlyphKey::new(self.font, ch, self.color, self.style);
            let glyph = *ctx.glyphs.query(key, ctx.fonts, ctx.backend);
            if let Some(texture) = glyph.texture {
                let dest = Rect::from_origin_size(pen + glyph.metrics.offset, glyph.size);
                if let Err(err) = ctx.backend.blit(texture, dest, None) {
                    log::warn!("Failed to draw glyph {:?} of '{}': {}", ch, node.name, err);
                }
            }
            pen.x += glyph.metrics.advance + self.letter_spacing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::software::SoftwareBackend;

    #[test]
    fn test_filled_rect_paints_bounds() {
        let mut backend = SoftwareBackend::new(8, 8);
        Shape::rect(Color::GREEN, true).paint(Rect::new(2.0, 2.0, 3.0, 3.0), &mut backend);
        assert_eq!(backend.pixel(3, 3), Some(Color::GREEN));
        assert_eq!(backend.pixel(6, 6), Some(Color::BLACK));
    }

    #[test]
    fn test_outline_rect_leaves_center() {
        let mut backend = SoftwareBackend::new(8, 8);
        Shape::rect(Color::RED, false).paint(Rect::new(0.0, 0.0, 6.0, 6.0), &mut backend);
        assert_eq!(backend.pixel(0, 0), Some(Color::RED));
        assert_eq!(backend.pixel(3, 3), Some(Color::BLACK));
    }

    #[test]
    fn test_pixel_shape() {
        let mut backend = SoftwareBackend::new(4, 4);
        Shape::pixel(Color::BLUE).paint(Rect::new(1.0, 2.0, 0.0, 0.0), &mut backend);
        assert_eq!(backend.pixel(1, 2), Some(Color::BLUE));
    }

    #[test]
    fn test_sprite_sheet_frames() {
        let sprite = Sprite {
            texture: None,
            owns_texture: false,
            source: None,
            frame_size: Some(Vec2::new(16.0, 16.0)),
            frame: 5,
        };
        // 4 columns x 2 rows
        assert_eq!(sprite.source_rect((64, 32)), Some(Rect::new(16.0, 16.0, 16.0, 16.0)));

        let wrapped = Sprite { frame: 9, ..sprite.clone() };
        assert_eq!(wrapped.source_rect((64, 32)), Some(Rect::new(16.0, 0.0, 16.0, 16.0)));
    }

    #[test]
    fn test_sprite_with_missing_file_has_no_texture() {
        let mut backend = SoftwareBackend::new(4, 4);
        let sprite = Sprite::from_file("/nonexistent/sprite.png", &mut backend);
        assert_eq!(sprite.texture(), None);
        assert_eq!(backend.texture_count(), 0);
    }

    #[test]
    fn test_sprite_releases_owned_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprite.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255])).save(&path).unwrap();

        let mut backend = SoftwareBackend::new(4, 4);
        let mut sprite = Sprite::from_file(&path, &mut backend);
        assert!(sprite.texture().is_some());
        assert_eq!(backend.texture_count(), 1);

        sprite.on_destroy(&Renderable::new("s"), &mut backend);
        assert_eq!(backend.texture_count(), 0);
    }
}
