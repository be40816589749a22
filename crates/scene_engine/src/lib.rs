//! # Scene Engine
//!
//! Retained-mode 2D scene core: a tree of renderables that is sorted, culled,
//! animated and drawn once per frame, plus the two subsystems that keep that
//! loop cheap.
//!
//! ## Features
//!
//! - **Scene tree**: arena-backed forest with z-ordering, camera culling and
//!   deferred structural changes from hooks
//! - **Keyframe animation**: shared, validated animations loaded from RON or
//!   TOML and applied through an explicit property registry
//! - **Glyph cache**: lazily rasterized, per-frame evicted glyph textures
//! - **Backends**: a narrow primitive/texture trait with an in-memory software
//!   implementation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let config = RendererConfig::default().with_fixed_timestep(16.0);
//!     let backend = SoftwareBackend::new(config.viewport_width, config.viewport_height);
//!     let mut renderer = Renderer::new(config, Box::new(backend), Box::new(FontdueRasterizer::new()))?;
//!
//!     renderer.add_renderable(
//!         Renderable::new("box")
//!             .with_position(10.0, 10.0)
//!             .with_size(32.0, 32.0)
//!             .with_behavior(Shape::rect(Color::RED, true)),
//!         None,
//!     )?;
//!
//!     let stats = renderer.render_frame()?;
//!     println!("rendered {} nodes", stats.rendered);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod animation;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod text;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{
            Animation, AnimationError, AnimationLibrary, AnimationLoader, PlaybackEvent, Property, StopReason,
            Value, ValueType,
        },
        config::{Config, RendererConfig},
        foundation::{
            color::Color,
            math::{Rect, Vec2},
        },
        render::{Camera, FrameStats, RenderBackend, RenderError, Renderer, SoftwareBackend},
        scene::{Behavior, Label, NodeId, Renderable, Shape, Sprite},
        text::{FontId, FontRasterizer, FontdueRasterizer, GlyphStyle},
    };
}
