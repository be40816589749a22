//! Keyframe values
//!
//! Keyframe values are resolved into a closed set of types when an animation
//! is loaded, so playback never has to interpret loosely typed data.

use std::fmt;
use std::str::FromStr;

use crate::foundation::math::{utils::lerp, Vec2};

/// Type tag of an animated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit signed integer
    Int,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// 2D float vector
    Vector2,
    /// Boolean (interpolates as a step)
    Bool,
}

impl ValueType {
    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Vector2 => "vector2",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = String;

    /// Accepts the canonical names plus the common aliases found in asset files
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "i32" => Ok(Self::Int),
            "float" | "single" | "f32" => Ok(Self::Float),
            "double" | "f64" => Ok(Self::Double),
            "vector2" | "vec2" | "vector" => Ok(Self::Vector2),
            "bool" | "boolean" => Ok(Self::Bool),
            other => Err(other.to_string()),
        }
    }
}

/// A typed keyframe or property value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Integer value
    Int(i32),
    /// Single precision value
    Float(f32),
    /// Double precision value
    Double(f64),
    /// 2D vector value
    Vector2(Vec2),
    /// Boolean value
    Bool(bool),
}

impl Value {
    /// Type tag of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Double(_) => ValueType::Double,
            Self::Vector2(_) => ValueType::Vector2,
            Self::Bool(_) => ValueType::Bool,
        }
    }

    /// Interpolate from `self` to `other` at `t` in [0, 1]
    ///
    /// Numbers and vectors interpolate linearly (integers round to nearest);
    /// booleans switch to `other` once `t >= 0.5`. Returns `None` when the
    /// two values have different types.
    pub fn interpolate(&self, other: &Self, t: f64) -> Option<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => {
                Some(Self::Int(lerp(f64::from(*a), f64::from(*b), t).round() as i32))
            }
            (Self::Float(a), Self::Float(b)) => {
                Some(Self::Float(lerp(f64::from(*a), f64::from(*b), t) as f32))
            }
            (Self::Double(a), Self::Double(b)) => Some(Self::Double(lerp(*a, *b, t))),
            (Self::Vector2(a), Self::Vector2(b)) => Some(Self::Vector2(Vec2::new(
                lerp(f64::from(a.x), f64::from(b.x), t) as f32,
                lerp(f64::from(a.y), f64::from(b.y), t) as f32,
            ))),
            (Self::Bool(a), Self::Bool(b)) => Some(Self::Bool(if t >= 0.5 { *b } else { *a })),
            _ => None,
        }
    }

    /// Floating point view of a `Float` or `Double`
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Double(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Integer view
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Vector view
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Self::Vector2(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}
