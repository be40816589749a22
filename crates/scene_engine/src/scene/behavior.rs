//! Per-type node hooks

use std::any::Any;

use crate::animation::playback::PlaybackEvent;
use crate::animation::registry::PropertySetter;
use crate::render::backend::RenderBackend;
use crate::scene::commands::CommandQueue;
use crate::scene::renderable::{NodeId, Renderable};
use crate::text::glyph_cache::GlyphCache;
use crate::text::rasterizer::FontRasterizer;

/// Everything a draw hook may touch
pub struct DrawContext<'a> {
    /// Target backend
    pub backend: &'a mut dyn RenderBackend,
    /// Shared glyph cache
    pub glyphs: &'a mut GlyphCache,
    /// Rasterizer the cache populates from
    pub fonts: &'a dyn FontRasterizer,
    /// Current frame index
    pub frame: u64,
}

/// Everything an update hook may touch
///
/// Hooks never see the tree; structural changes are queued on `commands` and
/// applied once the traversal has finished.
pub struct UpdateContext<'a> {
    /// Node being updated
    pub id: NodeId,
    /// Milliseconds since the previous frame
    pub delta_ms: f64,
    /// Current frame index
    pub frame: u64,
    /// Deferred scene mutations
    pub commands: &'a mut CommandQueue,
}

/// Behavior attached to a renderable
///
/// A node without a behavior is a pure group: it is culled, animated and
/// traversed, but never drawn.
pub trait Behavior: Any {
    /// Name used in logs and diagnostics
    fn type_name(&self) -> &'static str;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Animatable properties specific to this type
    fn properties(&self) -> &'static [(&'static str, PropertySetter)] {
        &[]
    }

    /// Whether the node has a draw hook
    fn draws(&self) -> bool {
        true
    }

    /// Called once, after the node is inserted
    fn on_create(&mut self, _node: &mut Renderable) {}

    /// Called once, after the node's children are removed
    fn on_destroy(&mut self, _node: &Renderable, _backend: &mut dyn RenderBackend) {}

    /// Draw owned sub-components, before [`Behavior::draw`]
    fn draw_components(&mut self, _node: &Renderable, _ctx: &mut DrawContext<'_>) {}

    /// Draw the node
    fn draw(&mut self, _node: &Renderable, _ctx: &mut DrawContext<'_>) {}

    /// Per-frame update, after animation
    fn update(&mut self, _node: &mut Renderable, _ctx: &mut UpdateContext<'_>) {}

    /// Playback state change of the node's animation
    fn on_animation_event(&mut self, _node: &mut Renderable, _event: PlaybackEvent) {}
}
