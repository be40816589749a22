//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - 2D math types and rectangles
//! - Colors
//! - Time management
//! - Logging utilities

pub mod math;
pub mod color;
pub mod time;
pub mod logging;
