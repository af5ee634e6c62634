//! Dynamic field values for resources and references.
//!
//! Server documents are schemaless JSON; [`Value`] mirrors the JSON shapes
//! and adds two entity variants, [`Value::Resource`] and [`Value::Reference`],
//! so a materialized document can hold live entities at relation positions.
//! Field maps are ordered ([`Map`] is an [`IndexMap`]) so documents round-trip
//! with their field order intact.
//!
//! The module also provides [`transform_values`], the generic tree-walk used
//! to rewrite nested values (reference normalization at construction,
//! pointer flattening at serialization) without duplicating traversal logic
//! per structural shape.

use indexmap::IndexMap;
use serde_json::Number;

use crate::error::Result;
use crate::model::entity::Entity;
use crate::model::{Reference, Resource};

/// An ordered mapping from field name to value.
pub type Map = IndexMap<String, Value>;

/// A dynamic field value.
///
/// Mirrors the JSON data model, extended with entity variants so nested
/// relations can be held as live [`Resource`]/[`Reference`] objects after
/// materialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// JSON string.
    String(String),
    /// JSON array.
    Array(Vec<Value>),
    /// JSON object that is not reference-shaped.
    Object(Map),
    /// A materialized resource held at a relation position.
    Resource(Resource),
    /// A pointer to a resource.
    Reference(Reference),
}

impl Value {
    /// Converts a raw JSON value into a [`Value`] tree.
    ///
    /// No entity conversion happens here; reference normalization is applied
    /// separately by [`Resource`](crate::Resource) construction.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, item)| (key, Self::from_json(item)))
                    .collect(),
            ),
        }
    }

    /// Converts the value back into raw JSON.
    ///
    /// Entities are flattened to pointers: a [`Value::Resource`] serializes
    /// as its derived reference, never as the full nested document, and a
    /// [`Value::Reference`] serializes as its own fields. This matches the
    /// wire format, which expects pointers at relation positions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when a nested
    /// resource has no id and therefore no derivable reference.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        match self {
            Self::Null => Ok(serde_json::Value::Null),
            Self::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Self::Number(n) => Ok(serde_json::Value::Number(n.clone())),
            Self::String(s) => Ok(serde_json::Value::String(s.clone())),
            Self::Array(items) => Ok(serde_json::Value::Array(
                items.iter().map(Self::to_json).collect::<Result<_>>()?,
            )),
            Self::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), item.to_json()?);
                }
                Ok(serde_json::Value::Object(out))
            }
            Self::Resource(resource) => resource.to_reference()?.serialize(),
            Self::Reference(reference) => reference.serialize(),
        }
    }

    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it is an unsigned integer.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Returns the value as `i64` if it is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the value as `f64` if it is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns the element list if this is an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the field map if this is a plain object value.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the resource if this is a resource value.
    #[must_use]
    pub const fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    /// Returns the reference if this is a reference value.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Reference(reference) => Some(reference),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Self::Object(value)
    }
}

impl From<Resource> for Value {
    fn from(value: Resource) -> Self {
        Self::Resource(value)
    }
}

impl From<Reference> for Value {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

/// Outcome of a [`transform_values`] step for a single node.
pub(crate) enum Transformed {
    /// Use the value as-is; do not descend into it.
    Done(Value),
    /// Keep the value and walk its children.
    Descend(Value),
}

/// Applies `transform` to every node of a value tree, top-down.
///
/// When the transform answers [`Transformed::Done`] the node is taken as-is
/// and its children are not visited; [`Transformed::Descend`] recurses into
/// arrays and objects. The traversal is independent of the concrete entity
/// types: callers supply the predicate and transformation.
pub(crate) fn transform_values<F>(value: Value, transform: &F) -> Result<Value>
where
    F: Fn(Value) -> Result<Transformed>,
{
    match transform(value)? {
        Transformed::Done(value) => Ok(value),
        Transformed::Descend(value) => match value {
            Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| transform_values(item, transform))
                    .collect::<Result<_>>()?,
            )),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key, transform_values(item, transform)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other),
        },
    }
}
