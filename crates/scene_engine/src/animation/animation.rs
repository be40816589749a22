//! Animation definitions
//!
//! An [`Animation`] is a validated, immutable set of keyframe tracks. It can
//! only be obtained through [`AnimationBuilder::build`] (or the loader, which
//! uses the builder), so every `Animation` in existence has passed
//! [`Animation::validate`]. Playback state lives on the renderable, which lets
//! one `Arc<Animation>` drive any number of nodes at once.

use std::collections::HashSet;

use crate::animation::value::{Value, ValueType};

/// Result type for animation operations
pub type AnimationResult<T> = Result<T, AnimationError>;

/// Configuration errors in animation data
///
/// All of these are fatal for the animation in question: it is rejected and
/// never played.
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    /// Duration must be strictly positive
    #[error("Animation '{source_path}' has non-positive duration {duration_ms}ms")]
    NonPositiveDuration {
        /// Source the animation came from
        source_path: String,
        /// Offending duration
        duration_ms: f64,
    },

    /// A property has no keyframes
    #[error("Property '{property}' has no keyframes")]
    EmptyProperty {
        /// Property name
        property: String,
    },

    /// The same property appears twice
    #[error("Property '{property}' is defined more than once")]
    DuplicateProperty {
        /// Property name
        property: String,
    },

    /// Keyframe placed before time zero
    #[error("Property '{property}' keyframe {index} has negative position {position}ms")]
    NegativeKeyframe {
        /// Property name
        property: String,
        /// Keyframe index
        index: usize,
        /// Offending position
        position: f64,
    },

    /// Keyframe position is NaN or infinite
    #[error("Property '{property}' keyframe {index} has non-finite position {position}")]
    NonFiniteKeyframe {
        /// Property name
        property: String,
        /// Keyframe index
        index: usize,
        /// Offending position
        position: f64,
    },

    /// Keyframe positions decrease
    #[error("Property '{property}' keyframe {index} at {position}ms comes before previous keyframe at {previous}ms")]
    KeyframesOutOfOrder {
        /// Property name
        property: String,
        /// Keyframe index
        index: usize,
        /// Offending position
        position: f64,
        /// Position of the keyframe before it
        previous: f64,
    },

    /// Keyframe positioned after the end of the animation
    #[error("Property '{property}' keyframe at {position}ms exceeds duration {duration_ms}ms")]
    KeyframeBeyondDuration {
        /// Property name
        property: String,
        /// Offending position
        position: f64,
        /// Declared duration
        duration_ms: f64,
    },

    /// Keyframe value type differs from the property type
    #[error("Property '{property}' keyframe {index} is {found}, expected {expected}")]
    TypeMismatch {
        /// Property name
        property: String,
        /// Keyframe index
        index: usize,
        /// Declared type
        expected: ValueType,
        /// Actual type
        found: ValueType,
    },

    /// Type tag not recognised by the loader
    #[error("Property '{property}' has unknown value type '{type_name}'")]
    UnknownValueType {
        /// Property name
        property: String,
        /// The unrecognised tag
        type_name: String,
    },

    /// Literal could not be converted to the declared type
    #[error("Property '{property}' keyframe {index}: cannot read '{literal}' as {expected}")]
    InvalidLiteral {
        /// Property name
        property: String,
        /// Keyframe index
        index: usize,
        /// Literal as written in the source
        literal: String,
        /// Declared type
        expected: ValueType,
    },

    /// The source document could not be parsed
    #[error("Failed to parse animation '{source_path}': {message}")]
    Parse {
        /// Source path
        source_path: String,
        /// Parser message
        message: String,
    },

    /// The source file could not be read
    #[error("Failed to read animation file: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown file extension
    #[error("Unsupported animation format: {0}")]
    UnsupportedFormat(String),
}

/// A (time, value) sample
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Time in milliseconds from the start of the animation
    pub position: f64,
    /// Value at that time
    pub value: Value,
}

impl Keyframe {
    /// Create a keyframe
    pub fn new(position: f64, value: Value) -> Self {
        Self { position, value }
    }
}

/// One animated property with its keyframe track
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Name of the target property (looked up in the property registry)
    pub name: String,
    /// Declared value type
    pub value_type: ValueType,
    /// Keyframes, ordered by position
    pub keyframes: Vec<Keyframe>,
}

impl Property {
    /// Create an empty property track
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            keyframes: Vec::new(),
        }
    }

    /// Append a keyframe (builder pattern)
    pub fn with_keyframe(mut self, position: f64, value: Value) -> Self {
        self.keyframes.push(Keyframe::new(position, value));
        self
    }

    /// Value of this track at `time`, if a bracketing keyframe pair exists
    ///
    /// A single keyframe holds its value for all time. Two keyframes at the
    /// same position form a jump and yield the later value.
    pub fn sample(&self, time: f64) -> Option<Value> {
        if let [only] = self.keyframes.as_slice() {
            return Some(only.value);
        }

        // Searched from the end so a jump (two keyframes at one position)
        // resolves to the later value.
        self.keyframes.windows(2).rev().find_map(|pair| {
            let (this, next) = (&pair[0], &pair[1]);
            if time < this.position || time > next.position {
                return None;
            }
            let span = next.position - this.position;
            if span <= 0.0 {
                return Some(next.value);
            }
            let t = (time - this.position) / span;
            this.value.interpolate(&next.value, t)
        })
    }
}

/// A validated keyframe animation
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    source: String,
    duration_ms: f64,
    repeat: i32,
    reverse: bool,
    properties: Vec<Property>,
}

impl Animation {
    /// Start building an animation
    pub fn builder(source: impl Into<String>, duration_ms: f64) -> AnimationBuilder {
        AnimationBuilder {
            animation: Self {
                source: source.into(),
                duration_ms,
                repeat: 0,
                reverse: false,
                properties: Vec::new(),
            },
        }
    }

    /// Where this animation was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Repeat count (0 = play once, negative = forever)
    pub fn repeat(&self) -> i32 {
        self.repeat
    }

    /// Whether repeats are unlimited
    pub fn repeats_forever(&self) -> bool {
        self.repeat < 0
    }

    /// Whether tracks play back to front
    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// Animated properties
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Sample every property at `elapsed_ms`
    ///
    /// Properties with no bracketing keyframe pair at that time are skipped.
    pub fn sample_all(&self, elapsed_ms: f64) -> impl Iterator<Item = (&str, Value)> + '_ {
        let time = self.track_time(elapsed_ms);
        self.properties
            .iter()
            .filter_map(move |property| property.sample(time).map(|value| (property.name.as_str(), value)))
    }

    /// Sample one property by name
    pub fn sample(&self, property: &str, elapsed_ms: f64) -> Option<Value> {
        let time = self.track_time(elapsed_ms);
        self.properties
            .iter()
            .find(|p| p.name == property)
            .and_then(|p| p.sample(time))
    }

    fn track_time(&self, elapsed_ms: f64) -> f64 {
        if self.reverse {
            (self.duration_ms - elapsed_ms).clamp(0.0, self.duration_ms)
        } else {
            elapsed_ms
        }
    }

    /// Check every structural invariant
    pub fn validate(&self) -> AnimationResult<()> {
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return Err(AnimationError::NonPositiveDuration {
                source_path: self.source.clone(),
                duration_ms: self.duration_ms,
            });
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(AnimationError::DuplicateProperty {
                    property: property.name.clone(),
                });
            }
            self.validate_property(property)?;
        }

        Ok(())
    }

    fn validate_property(&self, property: &Property) -> AnimationResult<()> {
        if property.keyframes.is_empty() {
            return Err(AnimationError::EmptyProperty {
                property: property.name.clone(),
            });
        }

        let mut previous: Option<&Keyframe> = None;
        for (index, keyframe) in property.keyframes.iter().enumerate() {
            if !keyframe.position.is_finite() {
                return Err(AnimationError::NonFiniteKeyframe {
                    property: property.name.clone(),
                    index,
                    position: keyframe.position,
                });
            }
            if keyframe.position < 0.0 {
                return Err(AnimationError::NegativeKeyframe {
                    property: property.name.clone(),
                    index,
                    position: keyframe.position,
                });
            }

            // Checked against the neighbour first so the error names the
            // pair that disagrees, then against the declared tag.
            let found = keyframe.value.value_type();
            if let Some(prev) = previous {
                if prev.value.value_type() != found {
                    return Err(AnimationError::TypeMismatch {
                        property: property.name.clone(),
                        index,
                        expected: prev.value.value_type(),
                        found,
                    });
                }
                if keyframe.position < prev.position {
                    return Err(AnimationError::KeyframesOutOfOrder {
                        property: property.name.clone(),
                        index,
                        position: keyframe.position,
                        previous: prev.position,
                    });
                }
            }
            if found != property.value_type {
                return Err(AnimationError::TypeMismatch {
                    property: property.name.clone(),
                    index,
                    expected: property.value_type,
                    found,
                });
            }

            previous = Some(keyframe);
        }

        if let Some(last) = previous {
            if last.position > self.duration_ms {
                return Err(AnimationError::KeyframeBeyondDuration {
                    property: property.name.clone(),
                    position: last.position,
                    duration_ms: self.duration_ms,
                });
            }
        }

        Ok(())
    }
}

/// Builder producing validated animations
#[derive(Debug, Clone)]
pub struct AnimationBuilder {
    animation: Animation,
}

impl AnimationBuilder {
    /// Set the repeat count (0 = once, negative = forever)
    pub fn repeat(mut self, repeat: i32) -> Self {
        self.animation.repeat = repeat;
        self
    }

    /// Play tracks back to front
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.animation.reverse = reverse;
        self
    }

    /// Add a property track
    pub fn property(mut self, property: Property) -> Self {
        self.animation.properties.push(property);
        self
    }

    /// Validate and finish
    pub fn build(self) -> AnimationResult<Animation> {
        self.animation.validate()?;
        Ok(self.animation)
    }
}
