//! Schema-gated structured document behavior shared by [`Resource`] and
//! [`Reference`].
//!
//! The [`Entity`] trait provides key-validated field access over a small set
//! of required accessors, the same way resources share CRUD behavior through
//! a trait with provided methods. When the owning client carries a schema,
//! every read and write of a top-level field is checked against the entity's
//! permitted key set; without a schema the gate is a no-op.
//!
//! [`Resource`]: crate::Resource
//! [`Reference`]: crate::Reference

use std::collections::HashSet;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::model::value::{Map, Value};

/// A schema-aware, key-validated structured document.
///
/// Implementors supply the backing field map, the owning client handle and
/// their permitted top-level key set; the trait provides gated accessors,
/// dotted-path lookup and serialization to the wire format.
///
/// # Identity
///
/// Every entity derives `id`, `resource_type` and `reference` from its
/// concrete shape: a resource derives its reference from
/// `{resourceType}/{id}`, a reference derives type and id by parsing its
/// reference string.
pub trait Entity {
    /// Returns the owning client.
    ///
    /// The handle is used only for schema lookups and server calls; entities
    /// never own the client.
    fn client(&self) -> &Client;

    /// Returns the backing field map.
    fn data(&self) -> &Map;

    /// Returns the backing field map mutably.
    ///
    /// Writes through this accessor bypass the schema gate; prefer
    /// [`Entity::set`].
    fn data_mut(&mut self) -> &mut Map;

    /// Returns the permitted top-level key set for this entity.
    ///
    /// Only consulted when the owning client carries a schema.
    fn root_keys(&self) -> HashSet<String>;

    /// Returns the id when the entity identifies one.
    fn id(&self) -> Option<&str>;

    /// Returns the resource type when the entity identifies one.
    fn resource_type(&self) -> Option<&str>;

    /// Returns the derived reference string, when one can be derived.
    fn reference(&self) -> Option<String>;

    /// Hook consulted before a write; the default accepts every key.
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::Argument`] to reject a write.
    fn validate_write(&self, key: &str) -> Result<()> {
        let _ = key;
        Ok(())
    }

    /// Validates `key` against the schema, if the client carries one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] naming the offending key and the
    /// permitted set.
    fn check_key(&self, key: &str) -> Result<()> {
        if self.client().schema().is_none() {
            return Ok(());
        }
        let allowed = self.root_keys();
        if allowed.contains(key) {
            Ok(())
        } else {
            Err(Error::invalid_field(key, allowed))
        }
    }

    /// Returns the value of a top-level field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] when the key violates the schema.
    fn get(&self, key: &str) -> Result<Option<&Value>> {
        self.check_key(key)?;
        Ok(self.data().get(key))
    }

    /// Sets a top-level field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] when the key violates the schema, or
    /// [`Error::Argument`] when the implementor rejects the write (for
    /// example, changing a resource's `resourceType`).
    fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.validate_write(key)?;
        self.check_key(key)?;
        self.data_mut().insert(key.to_string(), value.into());
        Ok(())
    }

    /// Returns the value of a top-level field, inserting `default` first when
    /// the field is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] when the key violates the schema.
    fn set_default(&mut self, key: &str, default: impl Into<Value>) -> Result<&mut Value> {
        self.check_key(key)?;
        Ok(self
            .data_mut()
            .entry(key.to_string())
            .or_insert_with(|| default.into()))
    }

    /// Looks up a nested value by dotted path.
    ///
    /// Path segments index into objects by key and into arrays by integer
    /// position, descending through nested entities:
    /// `get_by_path("name.0.family")`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] when the first segment violates the
    /// schema, or [`Error::Argument`] for an empty path.
    fn get_by_path(&self, path: &str) -> Result<Option<&Value>> {
        let mut segments = path.split('.');
        let Some(first) = segments.next().filter(|segment| !segment.is_empty()) else {
            return Err(Error::Argument("`path` must not be empty".to_string()));
        };
        self.check_key(first)?;

        let Some(mut current) = self.data().get(first) else {
            return Ok(None);
        };
        for segment in segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                Value::Resource(resource) => resource.data().get(segment),
                Value::Reference(reference) => reference.data().get(segment),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Serializes the entity into its wire form.
    ///
    /// Nested resources are replaced by their derived reference pointers and
    /// nested references by their own serialized fields; everything else
    /// passes through unchanged. The full nested document is never inlined.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when a nested resource has no id and
    /// therefore no derivable reference.
    fn serialize(&self) -> Result<serde_json::Value> {
        Value::Object(self.data().clone()).to_json()
    }
}
