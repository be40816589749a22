//! Keyframe animation engine
//!
//! Definitions ([`Animation`]) are immutable and shared; playback state
//! ([`AnimationPlayback`]) lives on each renderable; values reach renderables
//! through the [`PropertyRegistry`].

pub mod animation;
pub mod loader;
pub mod playback;
pub mod registry;
pub mod value;

pub use animation::{Animation, AnimationBuilder, AnimationError, AnimationResult, Keyframe, Property};
pub use loader::{AnimationFormat, AnimationLibrary, AnimationLoader};
pub use playback::{AnimationPlayback, PlaybackEvent, PlaybackState, StopReason};
pub use registry::{PropertyError, PropertyRegistry, PropertySetter};
pub use value::{Value, ValueType};
