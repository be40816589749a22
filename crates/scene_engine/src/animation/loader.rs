//! Declarative animation loading
//!
//! Animations are written in RON or TOML. Keyframe values are loosely typed
//! literals (numbers, booleans, `[x, y]` pairs or strings such as `"1.5"`,
//! `"3, 4"`, `"true"`); they are resolved against the property's declared
//! type here, at load time, and the result is validated before it is handed
//! out.
//!
//! ```ron
//! (
//!     duration: 1000,
//!     repeat: -1,
//!     properties: [
//!         (name: "position", type: "vector2", keyframes: [
//!             (position: 0, value: [0.0, 0.0]),
//!             (position: 1000, value: "100, 40"),
//!         ]),
//!     ],
//! )
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::animation::animation::{Animation, AnimationError, AnimationResult, Property};
use crate::animation::value::{Value, ValueType};
use crate::foundation::math::Vec2;

#[derive(Debug, Deserialize)]
struct AnimationDocument {
    duration: f64,
    #[serde(default)]
    repeat: i32,
    #[serde(default)]
    reverse: bool,
    #[serde(default)]
    properties: Vec<PropertyDocument>,
}

#[derive(Debug, Deserialize)]
struct PropertyDocument {
    name: String,
    #[serde(rename = "type")]
    value_type: String,
    #[serde(default)]
    keyframes: Vec<KeyframeDocument>,
}

#[derive(Debug, Deserialize)]
struct KeyframeDocument {
    position: f64,
    value: Literal,
}

/// Keyframe value as written in the source document
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Literal {
    Bool(bool),
    Int(i64),
    Number(f64),
    Pair([f64; 2]),
    Text(String),
}

impl Literal {
    fn describe(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Pair([x, y]) => format!("[{x}, {y}]"),
            Self::Text(s) => s.clone(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) | Self::Pair(_) => None,
        }
    }

    /// Resolve against a declared type
    fn resolve(&self, value_type: ValueType) -> Option<Value> {
        match value_type {
            ValueType::Int => match self {
                Self::Int(i) => i32::try_from(*i).ok().map(Value::Int),
                Self::Number(n) if n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX) => {
                    Some(Value::Int(*n as i32))
                }
                Self::Text(s) => s.trim().parse().ok().map(Value::Int),
                _ => None,
            },
            ValueType::Float => self.as_f64().map(|v| Value::Float(v as f32)),
            ValueType::Double => self.as_f64().map(Value::Double),
            ValueType::Vector2 => match self {
                Self::Pair([x, y]) => Some(Value::Vector2(Vec2::new(*x as f32, *y as f32))),
                Self::Text(s) => parse_vector(s).map(Value::Vector2),
                _ => None,
            },
            ValueType::Bool => match self {
                Self::Bool(b) => Some(Value::Bool(*b)),
                Self::Int(0) => Some(Value::Bool(false)),
                Self::Int(1) => Some(Value::Bool(true)),
                Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "off" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
        }
    }
}

/// Parse `"x,y"`, `"x y"` or `"(x, y)"`
fn parse_vector(text: &str) -> Option<Vec2> {
    let trimmed = text.trim().trim_start_matches(['(', '[']).trim_end_matches([')', ']']);
    let mut parts = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Vec2::new(x, y))
}

/// Source formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationFormat {
    /// Rusty Object Notation
    Ron,
    /// TOML
    Toml,
}

impl AnimationFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "ron" => Some(Self::Ron),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parses and validates animation documents
pub struct AnimationLoader;

impl AnimationLoader {
    /// Load and validate an animation file
    pub fn load_file(path: impl AsRef<Path>) -> AnimationResult<Animation> {
        let path = path.as_ref();
        let format = AnimationFormat::from_path(path)
            .ok_or_else(|| AnimationError::UnsupportedFormat(path.display().to_string()))?;
        let text = std::fs::read_to_string(path)?;
        Self::load_str(&path.display().to_string(), &text, format)
    }

    /// Parse and validate an animation from text
    ///
    /// `source` identifies the animation in errors and logs.
    pub fn load_str(source: &str, text: &str, format: AnimationFormat) -> AnimationResult<Animation> {
        let parse_error = |message: String| AnimationError::Parse {
            source_path: source.to_string(),
            message,
        };

        let document: AnimationDocument = match format {
            AnimationFormat::Ron => ron::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            AnimationFormat::Toml => toml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        };

        let animation = Self::build(source, document)?;
        log::debug!(
            "Loaded animation '{}' ({}ms, {} properties)",
            source,
            animation.duration_ms(),
            animation.properties().len()
        );
        Ok(animation)
    }

    fn build(source: &str, document: AnimationDocument) -> AnimationResult<Animation> {
        let mut builder = Animation::builder(source, document.duration)
            .repeat(document.repeat)
            .reverse(document.reverse);

        for property_doc in document.properties {
            let value_type: ValueType = property_doc.value_type.parse().map_err(|type_name| {
                AnimationError::UnknownValueType {
                    property: property_doc.name.clone(),
                    type_name,
                }
            })?;

            let mut property = Property::new(property_doc.name, value_type);
            for (index, keyframe) in property_doc.keyframes.into_iter().enumerate() {
                let value = keyframe.value.resolve(value_type).ok_or_else(|| {
                    AnimationError::InvalidLiteral {
                        property: property.name.clone(),
                        index,
                        literal: keyframe.value.describe(),
                        expected: value_type,
                    }
                })?;
                property = property.with_keyframe(keyframe.position, value);
            }
            builder = builder.property(property);
        }

        builder.build()
    }
}

/// Shared store of loaded animations, keyed by path
///
/// Loading the same file twice returns the same `Arc`, so every renderable
/// playing it shares one definition.
#[derive(Default)]
pub struct AnimationLibrary {
    animations: HashMap<PathBuf, Arc<Animation>>,
}

impl AnimationLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an animation, or return the already loaded copy
    pub fn load_or_get(&mut self, path: impl AsRef<Path>) -> AnimationResult<Arc<Animation>> {
        let path = path.as_ref();
        if let Some(animation) = self.animations.get(path) {
            return Ok(Arc::clone(animation));
        }

        let animation = Arc::new(AnimationLoader::load_file(path)?);
        self.animations.insert(path.to_path_buf(), Arc::clone(&animation));
        Ok(animation)
    }

    /// Register an animation built in code under a path-like name
    pub fn insert(&mut self, name: impl Into<PathBuf>, animation: Animation) -> Arc<Animation> {
        let animation = Arc::new(animation);
        self.animations.insert(name.into(), Arc::clone(&animation));
        animation
    }

    /// Get a loaded animation without loading
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Animation>> {
        self.animations.get(path.as_ref()).cloned()
    }

    /// Drop one animation; nodes already playing it keep their `Arc`
    pub fn remove(&mut self, path: impl AsRef<Path>) -> bool {
        self.animations.remove(path.as_ref()).is_some()
    }

    /// Number of loaded animations
    pub fn len(&self) -> usize {
        self.animations.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BOUNCE: &str = r#"(
        duration: 1000,
        repeat: 2,
        properties: [
            (name: "position", type: "vector2", keyframes: [
                (position: 0, value: [0.0, 0.0]),
                (position: 1000, value: "100, 40"),
            ]),
            (name: "visible", type: "bool", keyframes: [
                (position: 0, value: false),
                (position: 500, value: "true"),
            ]),
            (name: "z_index", type: "int", keyframes: [
                (position: 0, value: 1),
                (position: 1000, value: "4"),
            ]),
        ],
    )"#;

    #[test]
    fn test_load_ron_literals() {
        let animation = AnimationLoader::load_str("bounce.ron", BOUNCE, AnimationFormat::Ron).unwrap();

        assert_eq!(animation.repeat(), 2);
        assert_eq!(animation.properties().len(), 3);
        assert_eq!(
            animation.sample("position", 1000.0),
            Some(Value::Vector2(Vec2::new(100.0, 40.0)))
        );
        assert_eq!(animation.sample("visible", 500.0), Some(Value::Bool(true)));
        assert_eq!(animation.sample("z_index", 1000.0), Some(Value::Int(4)));
    }

    #[test]
    fn test_load_toml() {
        let text = r#"
            duration = 500.0
            reverse = true

            [[properties]]
            name = "x"
            type = "double"
            keyframes = [
                { position = 0.0, value = 1 },
                { position = 500.0, value = "2.5" },
            ]
        "#;
        let animation = AnimationLoader::load_str("slide.toml", text, AnimationFormat::Toml).unwrap();
        assert!(animation.is_reversed());
        assert_eq!(animation.sample("x", 0.0), Some(Value::Double(2.5)));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let text = r#"(duration: 10, properties: [(name: "tint", type: "color", keyframes: [])])"#;
        let result = AnimationLoader::load_str("tint.ron", text, AnimationFormat::Ron);
        assert!(matches!(result, Err(AnimationError::UnknownValueType { .. })));
    }

    #[test]
    fn test_bad_literal_is_rejected() {
        let text = r#"(duration: 10, properties: [(name: "x", type: "float", keyframes: [(position: 0, value: "abc")])])"#;
        let result = AnimationLoader::load_str("x.ron", text, AnimationFormat::Ron);
        assert!(matches!(result, Err(AnimationError::InvalidLiteral { index: 0, .. })));
    }

    #[test]
    fn test_keyframe_past_duration_fails_validation() {
        let text = r#"(duration: 100, properties: [(name: "x", type: "float", keyframes: [
            (position: 0, value: 0.0), (position: 250, value: 1.0)])])"#;
        let result = AnimationLoader::load_str("x.ron", text, AnimationFormat::Ron);
        assert!(matches!(result, Err(AnimationError::KeyframeBeyondDuration { .. })));
    }

    #[test]
    fn test_nan_keyframe_position_fails_validation() {
        let text = r#"(duration: 100, properties: [(name: "x", type: "float", keyframes: [
            (position: 0, value: 0.0), (position: NaN, value: 1.0)])])"#;
        let result = AnimationLoader::load_str("x.ron", text, AnimationFormat::Ron);
        assert!(matches!(result, Err(AnimationError::NonFiniteKeyframe { index: 1, .. })));
    }

    #[test]
    fn test_syntax_error() {
        let result = AnimationLoader::load_str("broken.ron", "(duration: ", AnimationFormat::Ron);
        assert!(matches!(result, Err(AnimationError::Parse { .. })));
    }

    #[test]
    fn test_parse_vector_forms() {
        assert_eq!(parse_vector("1,2"), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(parse_vector("(3.5 -4)"), Some(Vec2::new(3.5, -4.0)));
        assert_eq!(parse_vector("1,2,3"), None);
        assert_eq!(parse_vector("x,y"), None);
    }

    #[test]
    fn test_library_shares_loaded_animation() {
        let mut file = tempfile::Builder::new().suffix(".ron").tempfile().unwrap();
        write!(file, "{BOUNCE}").unwrap();

        let mut library = AnimationLibrary::new();
        let first = library.load_or_get(file.path()).unwrap();
        let second = library.load_or_get(file.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(library.len(), 1);
        assert_eq!(first.source(), file.path().display().to_string());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = AnimationLoader::load_file("anim.json");
        assert!(matches!(result, Err(AnimationError::UnsupportedFormat(_))));
    }
}
