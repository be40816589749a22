//! Scene nodes

use std::any::TypeId;
use std::fmt;

use crate::animation::playback::AnimationPlayback;
use crate::foundation::math::{Rect, Vec2};
use crate::scene::behavior::Behavior;

slotmap::new_key_type! {
    /// Handle to a renderable in a [`crate::scene::SceneTree`]
    pub struct NodeId;
}

/// A node of the scene tree
///
/// Spatial and ordering attributes are plain fields. `render_position` and
/// `is_on_screen` are recomputed by the cull pass every frame and are only
/// meaningful after it has run.
pub struct Renderable {
    /// Lookup name; need not be unique
    pub name: String,
    /// World position of the top-left corner
    pub position: Vec2,
    /// Width and height
    pub size: Vec2,
    /// Draw order among siblings, lower first
    pub z_index: i32,
    /// Hidden nodes are still updated and animated
    pub visible: bool,
    /// Always treated as on-screen
    pub not_cullable: bool,
    /// Ignore the camera; position is in screen space
    pub snap_to_screen: bool,
    render_position: Vec2,
    on_screen: bool,
    pub(crate) animation: Option<AnimationPlayback>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) behavior: Option<Box<dyn Behavior>>,
}

impl Renderable {
    /// Create a group node with no behavior
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec2::zeros(),
            size: Vec2::zeros(),
            z_index: 0,
            visible: true,
            not_cullable: false,
            snap_to_screen: false,
            render_position: Vec2::zeros(),
            on_screen: false,
            animation: None,
            parent: None,
            children: Vec::new(),
            behavior: None,
        }
    }

    /// Set position (builder pattern)
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    /// Set size (builder pattern)
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    /// Set z-index (builder pattern)
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Set visibility (builder pattern)
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Exempt from culling (builder pattern)
    pub fn with_not_cullable(mut self, not_cullable: bool) -> Self {
        self.not_cullable = not_cullable;
        self
    }

    /// Place in screen space (builder pattern)
    pub fn with_snap_to_screen(mut self, snap: bool) -> Self {
        self.snap_to_screen = snap;
        self
    }

    /// Attach a behavior (builder pattern)
    pub fn with_behavior(mut self, behavior: impl Behavior) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Replace the behavior; returns the old one
    pub fn set_behavior(&mut self, behavior: Option<Box<dyn Behavior>>) -> Option<Box<dyn Behavior>> {
        std::mem::replace(&mut self.behavior, behavior)
    }

    /// The attached behavior
    pub fn behavior(&self) -> Option<&dyn Behavior> {
        self.behavior.as_deref()
    }

    /// The attached behavior, mutably
    pub fn behavior_mut(&mut self) -> Option<&mut dyn Behavior> {
        match &mut self.behavior {
            Some(behavior) => Some(behavior.as_mut()),
            None => None,
        }
    }

    /// The behavior as a concrete type
    pub fn downcast_ref<T: Behavior>(&self) -> Option<&T> {
        self.behavior.as_ref()?.as_any().downcast_ref()
    }

    /// The behavior as a concrete type, mutably
    pub fn downcast_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.behavior.as_mut()?.as_any_mut().downcast_mut()
    }

    /// Type key used by the property registry
    pub fn behavior_type(&self) -> TypeId {
        match &self.behavior {
            Some(behavior) => behavior.as_any().type_id(),
            None => TypeId::of::<Renderable>(),
        }
    }

    /// Behavior type name, `"Group"` for plain nodes
    pub fn type_name(&self) -> &'static str {
        self.behavior.as_ref().map_or("Group", |behavior| behavior.type_name())
    }

    /// Whether the traversal calls a draw hook for this node
    pub fn draws(&self) -> bool {
        self.behavior.as_ref().is_some_and(|behavior| behavior.draws())
    }

    /// Camera-adjusted position from the last cull pass
    pub fn render_position(&self) -> Vec2 {
        self.render_position
    }

    /// Result of the last cull pass
    pub fn is_on_screen(&self) -> bool {
        self.on_screen
    }

    /// Screen-space box from the last cull pass
    pub fn render_bounds(&self) -> Rect {
        Rect::from_origin_size(self.render_position, self.size)
    }

    pub(crate) fn set_cull_result(&mut self, render_position: Vec2, on_screen: bool) {
        self.render_position = render_position;
        self.on_screen = on_screen;
    }

    /// Parent node, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in draw order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Bound animation playback
    pub fn animation(&self) -> Option<&AnimationPlayback> {
        self.animation.as_ref()
    }
}

impl fmt::Debug for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderable")
            .field("name", &self.name)
            .field("type", &self.type_name())
            .field("position", &self.position)
            .field("size", &self.size)
            .field("z_index", &self.z_index)
            .field("visible", &self.visible)
            .field("on_screen", &self.on_screen)
            .field("children", &self.children.len())
            .finish()
    }
}
