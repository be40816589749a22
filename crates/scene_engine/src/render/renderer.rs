//! Frame scheduler
//!
//! [`Renderer`] owns the scene tree, the camera, the glyph cache and the
//! backend, and runs one frame per [`Renderer::render_frame`] call:
//!
//! 1. stable sort of every sibling list by z-index
//! 2. cull against the camera and viewport
//! 3. pre-order traversal: draw, advance animation, update
//! 4. apply commands queued by hooks during the traversal
//! 5. evict glyphs that were not drawn this frame
//! 6. camera follow/shake update

use std::sync::Arc;

use crate::animation::animation::{Animation, AnimationError};
use crate::animation::playback::{AnimationPlayback, PlaybackEvent};
use crate::animation::registry::PropertyRegistry;
use crate::config::{ConfigError, RendererConfig};
use crate::foundation::time::FrameClock;
use crate::render::backend::{BackendError, RenderBackend};
use crate::render::camera::Camera;
use crate::scene::behavior::{DrawContext, UpdateContext};
use crate::scene::commands::{CommandQueue, SceneCommand};
use crate::scene::renderable::{NodeId, Renderable};
use crate::scene::tree::{CullParams, SceneError, SceneTree};
use crate::text::glyph_cache::GlyphCache;
use crate::text::rasterizer::{FontId, FontRasterizer};

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Renderer errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Culling needs a camera to compute render positions
    #[error("Culling is enabled but no camera is installed")]
    MissingCamera,

    /// Tree operation failed
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Animation rejected
    #[error(transparent)]
    Animation(#[from] AnimationError),

    /// Backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Milliseconds the animations advanced by
    pub delta_ms: f64,
    /// Nodes traversed
    pub visited: usize,
    /// Nodes the cull pass marked on-screen
    pub on_screen: usize,
    /// Nodes whose draw hook ran
    pub rendered: usize,
    /// Running animations advanced
    pub animations_advanced: usize,
    /// Deferred commands applied after the traversal
    pub commands_applied: usize,
    /// Glyph cache entries evicted
    pub glyphs_evicted: usize,
}

/// Playback notification tagged with its node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationEvent {
    /// Node whose animation changed state
    pub node: NodeId,
    /// What happened
    pub event: PlaybackEvent,
}

/// Retained-mode 2D renderer
pub struct Renderer {
    config: RendererConfig,
    tree: SceneTree,
    camera: Option<Camera>,
    glyphs: GlyphCache,
    backend: Box<dyn RenderBackend>,
    fonts: Box<dyn FontRasterizer>,
    clock: FrameClock,
    properties: PropertyRegistry,
    commands: CommandQueue,
    events: Vec<AnimationEvent>,
    frame: u64,
}

impl Renderer {
    /// Create a renderer with a default camera
    pub fn new(
        config: RendererConfig,
        backend: Box<dyn RenderBackend>,
        fonts: Box<dyn FontRasterizer>,
    ) -> RenderResult<Self> {
        config.validate()?;

        let viewport = backend.viewport_size();
        log::info!(
            "Renderer initialized: viewport {}x{}, culling {}, {}",
            viewport.x,
            viewport.y,
            if config.culling_enabled { "on" } else { "off" },
            match config.fixed_timestep_ms {
                Some(step) => format!("fixed step {step}ms"),
                None => "real-time clock".to_string(),
            }
        );

        Ok(Self {
            glyphs: GlyphCache::new(config.fallback_glyph),
            clock: FrameClock::from_fixed_step(config.fixed_timestep_ms),
            config,
            tree: SceneTree::new(),
            camera: Some(Camera::default()),
            backend,
            fonts,
            properties: PropertyRegistry::new(),
            commands: CommandQueue::new(),
            events: Vec::new(),
            frame: 0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Number of frames rendered so far
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    /// Replace the frame clock
    pub fn set_clock(&mut self, clock: FrameClock) {
        self.clock = clock;
    }

    /// Enable or disable culling
    pub fn set_culling_enabled(&mut self, enabled: bool) {
        self.config.culling_enabled = enabled;
    }

    /// The scene tree (read-only; mutate through the renderer)
    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    /// Active camera
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Active camera, mutably
    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// Install or remove the camera; returns the previous one
    pub fn set_camera(&mut self, camera: Option<Camera>) -> Option<Camera> {
        std::mem::replace(&mut self.camera, camera)
    }

    /// Glyph cache
    pub fn glyph_cache(&self) -> &GlyphCache {
        &self.glyphs
    }

    /// Rendering backend
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Rendering backend, mutably (e.g. to load textures)
    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Backend as its concrete type
    pub fn backend_as<T: RenderBackend + 'static>(&self) -> Option<&T> {
        self.backend.as_any().downcast_ref()
    }

    /// Font rasterizer
    pub fn fonts(&self) -> &dyn FontRasterizer {
        self.fonts.as_ref()
    }

    /// Property registry
    pub fn properties_mut(&mut self) -> &mut PropertyRegistry {
        &mut self.properties
    }

    /// Queue a mutation to apply after the next traversal
    pub fn commands(&mut self) -> &mut CommandQueue {
        &mut self.commands
    }

    /// Take the playback notifications collected since the last call
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Insert a node and run its creation hook
    pub fn add_renderable(&mut self, node: Renderable, parent: Option<NodeId>) -> RenderResult<NodeId> {
        if let Some(behavior) = node.behavior() {
            self.properties.register_behavior(behavior);
        }

        let id = self.tree.insert(node, parent)?;
        if let Some(node) = self.tree.get_mut(id) {
            if let Some(mut behavior) = node.behavior.take() {
                behavior.on_create(node);
                node.behavior = Some(behavior);
            }
            log::debug!("Added {} '{}' as {:?}", node.type_name(), node.name, id);
        }
        Ok(id)
    }

    /// Remove a node and its subtree
    ///
    /// Children are torn down before their parents. Returns false if the node
    /// was not in the tree.
    pub fn remove_renderable(&mut self, id: NodeId) -> bool {
        let backend = self.backend.as_mut();
        let mut removed = 0;
        let found = self.tree.remove_with(id, |_, node| {
            if let Some(mut behavior) = node.behavior.take() {
                behavior.on_destroy(node, backend);
            }
            removed += 1;
        });
        if found {
            log::debug!("Removed {:?} ({} nodes)", id, removed);
        }
        found
    }

    /// Move a subtree under another parent, or to the roots
    pub fn reparent(&mut self, id: NodeId, parent: Option<NodeId>) -> RenderResult<()> {
        self.tree.reparent(id, parent)?;
        Ok(())
    }

    /// First node named `name`, optionally within a subtree
    pub fn find_by_name(&self, name: &str, scope: Option<NodeId>) -> Option<NodeId> {
        self.tree.find_by_name(name, scope)
    }

    /// Get a node
    pub fn node(&self, id: NodeId) -> Option<&Renderable> {
        self.tree.get(id)
    }

    /// Get a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Renderable> {
        self.tree.get_mut(id)
    }

    /// Bind an animation to a node, replacing any previous binding
    ///
    /// Properties the node's type does not support are reported here and
    /// skipped during playback.
    pub fn bind_animation(&mut self, id: NodeId, animation: Arc<Animation>) -> RenderResult<()> {
        let node = self.tree.get_mut(id).ok_or(SceneError::UnknownNode(id))?;

        let unsupported = self.properties.unsupported(node, &animation);
        if !unsupported.is_empty() {
            log::warn!(
                "Animation '{}' targets properties {:?} that {} '{}' does not have",
                animation.source(),
                unsupported,
                node.type_name(),
                node.name
            );
        }

        node.animation = Some(AnimationPlayback::new(animation));
        Ok(())
    }

    /// Start (or restart) a node's animation
    ///
    /// Returns false if the node has no bound animation.
    pub fn start_animation(&mut self, id: NodeId) -> bool {
        let Some(event) = self
            .tree
            .get_mut(id)
            .and_then(|node| node.animation.as_mut())
            .map(AnimationPlayback::start)
        else {
            return false;
        };
        self.notify(id, event);
        true
    }

    /// Stop a node's animation; returns false if it was not running
    pub fn stop_animation(&mut self, id: NodeId) -> bool {
        let Some(event) = self
            .tree
            .get_mut(id)
            .and_then(|node| node.animation.as_mut())
            .and_then(AnimationPlayback::stop)
        else {
            return false;
        };
        self.notify(id, event);
        true
    }

    fn notify(&mut self, id: NodeId, event: PlaybackEvent) {
        if let Some(node) = self.tree.get_mut(id) {
            if let Some(mut behavior) = node.behavior.take() {
                behavior.on_animation_event(node, event);
                node.behavior = Some(behavior);
            }
        }
        self.events.push(AnimationEvent { node: id, event });
    }

    /// Drop cached glyphs of an unloaded font
    pub fn release_font(&mut self, font: FontId) -> usize {
        self.glyphs.delete_font(font, self.backend.as_mut())
    }

    /// Render one frame
    pub fn render_frame(&mut self) -> RenderResult<FrameStats> {
        if self.config.culling_enabled && self.camera.is_none() {
            return Err(RenderError::MissingCamera);
        }

        let delta_ms = self.clock.tick();
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            delta_ms,
            ..FrameStats::default()
        };

        self.tree.sort_by_z();
        stats.on_screen = self.tree.cull(CullParams {
            camera: self.camera.as_ref(),
            viewport: self.backend.viewport_size(),
            culling_enabled: self.config.culling_enabled,
        });

        self.backend.begin_frame(self.config.clear_color);
        let order = self.tree.pre_order();
        stats.visited = order.len();
        for id in order {
            self.visit(id, delta_ms, &mut stats);
        }
        self.backend.end_frame();

        stats.commands_applied = self.flush_commands();
        stats.glyphs_evicted = self.glyphs.purge_unused(self.backend.as_mut());

        if let Some(camera) = self.camera.as_mut() {
            camera.update(delta_ms);
        }

        log::trace!(
            "Frame {}: {} visited, {} on screen, {} rendered, {} animated",
            stats.frame,
            stats.visited,
            stats.on_screen,
            stats.rendered,
            stats.animations_advanced
        );
        Ok(stats)
    }

    /// Draw, animate and update one node
    fn visit(&mut self, id: NodeId, delta_ms: f64, stats: &mut FrameStats) {
        let Some(node) = self.tree.get_mut(id) else { return };

        if node.is_on_screen() && node.visible && node.draws() {
            if let Some(mut behavior) = node.behavior.take() {
                let mut ctx = DrawContext {
                    backend: self.backend.as_mut(),
                    glyphs: &mut self.glyphs,
                    fonts: self.fonts.as_ref(),
                    frame: self.frame,
                };
                behavior.draw_components(node, &mut ctx);
                behavior.draw(node, &mut ctx);
                node.behavior = Some(behavior);
                stats.rendered += 1;
            }
        }

        if let Some(mut playback) = node.animation.take() {
            if playback.is_running() {
                stats.animations_advanced += 1;
            }
            let properties = &mut self.properties;
            let event = playback.advance(delta_ms, |name, value| {
                properties.apply(node, name, &value);
            });
            node.animation = Some(playback);

            if let Some(event) = event {
                if let Some(mut behavior) = node.behavior.take() {
                    behavior.on_animation_event(node, event);
                    node.behavior = Some(behavior);
                }
                self.events.push(AnimationEvent { node: id, event });
            }
        }

        if let Some(mut behavior) = node.behavior.take() {
            let mut ctx = UpdateContext {
                id,
                delta_ms,
                frame: self.frame,
                commands: &mut self.commands,
            };
            behavior.update(node, &mut ctx);
            node.behavior = Some(behavior);
        }
    }

    /// Apply queued commands in request order
    fn flush_commands(&mut self) -> usize {
        let commands = self.commands.take();
        let count = commands.len();
        for command in commands {
            match command {
                SceneCommand::Add { node, parent } => {
                    if let Err(err) = self.add_renderable(node, parent) {
                        log::warn!("Deferred add failed: {}", err);
                    }
                }
                SceneCommand::Remove(id) => {
                    self.remove_renderable(id);
                }
                SceneCommand::BindAnimation(id, animation) => {
                    if let Err(err) = self.bind_animation(id, animation) {
                        log::warn!("Deferred animation binding failed: {}", err);
                    }
                }
                SceneCommand::StartAnimation(id) => {
                    self.start_animation(id);
                }
                SceneCommand::StopAnimation(id) => {
                    self.stop_animation(id);
                }
                SceneCommand::SetVisible(id, visible) => {
                    if let Some(node) = self.tree.get_mut(id) {
                        node.visible = visible;
                    }
                }
            }
        }
        count
    }

    /// Tear down every node and release all cached glyphs
    pub fn shutdown(&mut self) {
        let roots = self.tree.roots().to_vec();
        for root in roots {
            self.remove_renderable(root);
        }
        self.glyphs.clear(self.backend.as_mut());
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if !self.tree.is_empty() || !self.glyphs.is_empty() {
            log::debug!("Releasing renderer resources");
            self.shutdown();
        }
    }
}
