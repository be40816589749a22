//! Rendering: backend contract, camera and the frame scheduler

pub mod backend;
pub mod camera;
pub mod renderer;
pub mod software;

pub use backend::{BackendError, BackendResult, PixelBuffer, RenderBackend, TextureHandle};
pub use camera::Camera;
pub use renderer::{AnimationEvent, FrameStats, RenderError, RenderResult, Renderer};
pub use software::{BackendStats, SoftwareBackend};
