//! Scene graph: renderables, their behaviors and the tree that owns them

pub mod behavior;
pub mod commands;
pub mod nodes;
pub mod renderable;
pub mod tree;

pub use behavior::{Behavior, DrawContext, UpdateContext};
pub use commands::{CommandQueue, SceneCommand};
pub use nodes::{Label, Shape, ShapeKind, Sprite};
pub use renderable::{NodeId, Renderable};
pub use tree::{CullParams, SceneError, SceneTree};
