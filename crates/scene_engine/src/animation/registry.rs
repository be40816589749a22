//! Property registry
//!
//! Maps `(behavior type, property name)` to a typed setter. Animations address
//! properties by name; nothing is resolved by reflection. A handful of common
//! properties apply to every renderable, and each behavior type contributes
//! its own the first time a node of that type is added.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use crate::animation::animation::Animation;
use crate::animation::value::{Value, ValueType};
use crate::foundation::math::Vec2;
use crate::scene::behavior::Behavior;
use crate::scene::renderable::Renderable;

/// Errors from applying a value to a property
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// No setter is registered under this name for the node's type
    #[error("'{type_name}' has no animatable property '{property}'")]
    UnknownProperty {
        /// Property name
        property: String,
        /// Behavior type of the target node
        type_name: &'static str,
    },

    /// The value does not fit the setter
    #[error("Property '{property}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Property name
        property: &'static str,
        /// Type the setter reads
        expected: ValueType,
        /// Type of the sampled value
        found: ValueType,
    },

    /// The setter's behavior is not attached to the node
    #[error("Property '{property}' needs a '{type_name}' behavior")]
    MissingBehavior {
        /// Property name
        property: &'static str,
        /// Behavior the setter writes into
        type_name: &'static str,
    },
}

/// Typed property setter
pub type PropertySetter = fn(&mut Renderable, &Value) -> Result<(), PropertyError>;

/// Read a value as `f32` (float or double)
pub fn expect_f32(property: &'static str, value: &Value) -> Result<f32, PropertyError> {
    value.as_f32().ok_or(PropertyError::TypeMismatch {
        property,
        expected: ValueType::Float,
        found: value.value_type(),
    })
}

/// Read a value as `i32`
pub fn expect_i32(property: &'static str, value: &Value) -> Result<i32, PropertyError> {
    value.as_i32().ok_or(PropertyError::TypeMismatch {
        property,
        expected: ValueType::Int,
        found: value.value_type(),
    })
}

/// Read a value as a 2D vector
pub fn expect_vec2(property: &'static str, value: &Value) -> Result<Vec2, PropertyError> {
    value.as_vec2().ok_or(PropertyError::TypeMismatch {
        property,
        expected: ValueType::Vector2,
        found: value.value_type(),
    })
}

/// Read a value as a boolean
pub fn expect_bool(property: &'static str, value: &Value) -> Result<bool, PropertyError> {
    value.as_bool().ok_or(PropertyError::TypeMismatch {
        property,
        expected: ValueType::Bool,
        found: value.value_type(),
    })
}

fn set_position(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.position = expect_vec2("position", value)?;
    Ok(())
}

fn set_x(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.position.x = expect_f32("x", value)?;
    Ok(())
}

fn set_y(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.position.y = expect_f32("y", value)?;
    Ok(())
}

fn set_size(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.size = expect_vec2("size", value)?;
    Ok(())
}

fn set_width(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.size.x = expect_f32("width", value)?;
    Ok(())
}

fn set_height(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.size.y = expect_f32("height", value)?;
    Ok(())
}

fn set_z_index(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.z_index = expect_i32("z_index", value)?;
    Ok(())
}

fn set_visible(node: &mut Renderable, value: &Value) -> Result<(), PropertyError> {
    node.visible = expect_bool("visible", value)?;
    Ok(())
}

/// Properties every renderable has
const COMMON_PROPERTIES: &[(&str, PropertySetter)] = &[
    ("position", set_position),
    ("x", set_x),
    ("y", set_y),
    ("size", set_size),
    ("width", set_width),
    ("height", set_height),
    ("z_index", set_z_index),
    ("visible", set_visible),
];

/// Registry of animatable properties
pub struct PropertyRegistry {
    common: HashMap<&'static str, PropertySetter>,
    typed: HashMap<(TypeId, &'static str), PropertySetter>,
    registered: HashSet<TypeId>,
    warned: HashSet<(TypeId, String)>,
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyRegistry {
    /// Create a registry holding the common properties
    pub fn new() -> Self {
        Self {
            common: COMMON_PROPERTIES.iter().copied().collect(),
            typed: HashMap::new(),
            registered: HashSet::new(),
            warned: HashSet::new(),
        }
    }

    /// Register the properties of a behavior's concrete type
    ///
    /// Only the first call per type does anything; returns whether it did.
    pub fn register_behavior(&mut self, behavior: &dyn Behavior) -> bool {
        let type_id = behavior.as_any().type_id();
        if !self.registered.insert(type_id) {
            return false;
        }

        for &(name, setter) in behavior.properties() {
            self.typed.insert((type_id, name), setter);
        }
        log::debug!(
            "Registered {} properties for '{}'",
            behavior.properties().len(),
            behavior.type_name()
        );
        true
    }

    /// Register one setter for a type by hand
    pub fn register(&mut self, type_id: TypeId, name: &'static str, setter: PropertySetter) {
        self.typed.insert((type_id, name), setter);
    }

    /// Check whether nodes of `type_id` support `name`
    pub fn supports(&self, type_id: TypeId, name: &str) -> bool {
        self.common.contains_key(name) || self.typed.contains_key(&(type_id, name))
    }

    fn setter(&self, type_id: TypeId, name: &str) -> Option<PropertySetter> {
        self.typed
            .get(&(type_id, name))
            .or_else(|| self.common.get(name))
            .copied()
    }

    /// Assign a value through the registered setter
    pub fn set(&self, node: &mut Renderable, name: &str, value: &Value) -> Result<(), PropertyError> {
        let setter = self.setter(node.behavior_type(), name).ok_or_else(|| PropertyError::UnknownProperty {
            property: name.to_string(),
            type_name: node.type_name(),
        })?;
        setter(node, value)
    }

    /// Assign a value, logging the first failure per type and property
    ///
    /// Returns whether the value was applied.
    pub fn apply(&mut self, node: &mut Renderable, name: &str, value: &Value) -> bool {
        match self.set(node, name, value) {
            Ok(()) => true,
            Err(err) => {
                if self.warned.insert((node.behavior_type(), name.to_string())) {
                    log::warn!("Skipping animated property on '{}': {}", node.name, err);
                }
                false
            }
        }
    }

    /// Property names of `animation` that nodes of `node`'s type cannot take
    pub fn unsupported<'a>(&self, node: &Renderable, animation: &'a Animation) -> Vec<&'a str> {
        let type_id = node.behavior_type();
        animation
            .properties()
            .iter()
            .map(|property| property.name.as_str())
            .filter(|name| !self.supports(type_id, name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::animation::Property;
    use crate::foundation::color::Color;
    use crate::scene::nodes::Shape;
    use approx::assert_relative_eq;

    #[test]
    fn test_common_properties() {
        let registry = PropertyRegistry::new();
        let mut node = Renderable::new("n");

        registry.set(&mut node, "position", &Value::Vector2(Vec2::new(3.0, 4.0))).unwrap();
        registry.set(&mut node, "width", &Value::Double(12.5)).unwrap();
        registry.set(&mut node, "z_index", &Value::Int(-2)).unwrap();
        registry.set(&mut node, "visible", &Value::Bool(false)).unwrap();

        assert_relative_eq!(node.position.x, 3.0);
        assert_relative_eq!(node.size.x, 12.5);
        assert_eq!(node.z_index, -2);
        assert!(!node.visible);
    }

    #[test]
    fn test_type_mismatch() {
        let registry = PropertyRegistry::new();
        let mut node = Renderable::new("n");
        let result = registry.set(&mut node, "visible", &Value::Float(1.0));
        assert!(matches!(result, Err(PropertyError::TypeMismatch { expected: ValueType::Bool, .. })));
    }

    #[test]
    fn test_behavior_properties_need_registration() {
        let mut registry = PropertyRegistry::new();
        let mut node = Renderable::new("box").with_behavior(Shape::rect(Color::RED, false));

        assert!(matches!(
            registry.set(&mut node, "filled", &Value::Bool(true)),
            Err(PropertyError::UnknownProperty { .. })
        ));

        assert!(registry.register_behavior(node.behavior().unwrap()));
        assert!(!registry.register_behavior(node.behavior().unwrap()));

        registry.set(&mut node, "filled", &Value::Bool(true)).unwrap();
        assert!(node.downcast_ref::<Shape>().unwrap().filled);
    }

    #[test]
    fn test_group_nodes_do_not_take_behavior_properties() {
        let mut registry = PropertyRegistry::new();
        let shape = Renderable::new("s").with_behavior(Shape::rect(Color::RED, false));
        registry.register_behavior(shape.behavior().unwrap());

        let mut group = Renderable::new("g");
        assert!(!registry.apply(&mut group, "filled", &Value::Bool(true)));
        assert!(registry.apply(&mut group, "x", &Value::Float(1.0)));
    }

    #[test]
    fn test_unsupported_names() {
        let registry = PropertyRegistry::new();
        let node = Renderable::new("n");
        let animation = Animation::builder("a", 10.0)
            .property(Property::new("x", ValueType::Float).with_keyframe(0.0, Value::Float(0.0)))
            .property(Property::new("glow", ValueType::Float).with_keyframe(0.0, Value::Float(0.0)))
            .build()
            .unwrap();

        assert_eq!(registry.unsupported(&node, &animation), vec!["glow"]);
    }
}
