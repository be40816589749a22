//! Configuration system
//!
//! Configuration files are TOML or RON, chosen by file extension. The
//! renderer reads [`RendererConfig`]; applications can implement [`Config`]
//! for their own settings structs.

pub use serde::{Serialize, Deserialize};

use crate::foundation::color::Color;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Renderer Configuration
///
/// Settings for the frame scheduler: viewport, culling, timing and the
/// glyph cache fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// When false every node is treated as on-screen (diagnostics)
    pub culling_enabled: bool,
    /// Fixed animation step per frame; `None` measures real time
    pub fixed_timestep_ms: Option<f64>,
    /// Character rasterized in place of glyphs missing from a font
    pub fallback_glyph: char,
    /// Color the backend clears to at the start of each frame
    pub clear_color: Color,
    /// Default log filter used by [`crate::foundation::logging::init_with_level`]
    pub log_level: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            culling_enabled: true,
            fixed_timestep_ms: None,
            fallback_glyph: '?',
            clear_color: Color::BLACK,
            log_level: "info".to_string(),
        }
    }
}

impl Config for RendererConfig {}

impl RendererConfig {
    /// Set viewport dimensions
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Use a fixed frame step (deterministic playback)
    pub fn with_fixed_timestep(mut self, step_ms: f64) -> Self {
        self.fixed_timestep_ms = Some(step_ms);
        self
    }

    /// Enable or disable culling
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.culling_enabled = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport_width, self.viewport_height
            )));
        }

        if let Some(step) = self.fixed_timestep_ms {
            if !step.is_finite() || step <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "fixed timestep must be positive, got {step}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RendererConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_viewport() {
        let config = RendererConfig::default().with_viewport(0, 600);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_positive_timestep() {
        let config = RendererConfig::default().with_fixed_timestep(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "viewport_width = 320\nviewport_height = 200\nculling_enabled = false\n").unwrap();

        let config = RendererConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.viewport_width, 320);
        assert_eq!(config.viewport_height, 200);
        assert!(!config.culling_enabled);
        // Missing fields fall back to defaults
        assert_eq!(config.fallback_glyph, '?');
    }

    #[test]
    fn test_ron_round_trip() {
        let file = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = RendererConfig::default().with_fixed_timestep(16.0);
        config.save_to_file(&path).unwrap();

        let loaded = RendererConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.fixed_timestep_ms, Some(16.0));
    }

    #[test]
    fn test_unsupported_extension() {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        write!(file, "viewport_width = 320\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let result = RendererConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ref p)) if *p == path));
        assert!(matches!(
            RendererConfig::default().save_to_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
