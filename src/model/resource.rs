//! Resource entities: materialized, typed documents with identity.
//!
//! A [`Resource`] is created through [`Client::resource`] or by
//! materializing a server document. Construction recursively normalizes
//! reference-shaped sub-documents into [`Reference`] values; persistence
//! goes through [`Resource::save`] and [`Resource::delete`].
//!
//! [`Client::resource`]: crate::Client::resource

use std::collections::HashSet;
use std::fmt;

use crate::client::transport::HttpMethod;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::model::entity::Entity;
use crate::model::reference::{is_reference_shape, Reference};
use crate::model::value::{transform_values, Map, Transformed, Value};

/// Top-level keys every resource may carry regardless of schema.
const IDENTITY_KEYS: [&str; 4] = ["resourceType", "id", "meta", "extension"];

/// A materialized resource document.
///
/// The resource type is fixed at construction and cannot be changed through
/// [`Entity::set`]; the id is absent until the resource is persisted. Two
/// resources are equal when they derive the same reference string.
///
/// # Lifecycle
///
/// An unsaved resource (no id) is created by [`Client::resource`];
/// [`Resource::save`] inserts it (or fully updates it when an id is present)
/// and registers it in the client's cache; [`Resource::delete`] evicts it
/// from the cache and removes it from the server. A deleted resource remains
/// usable as a plain document, and a further `save` re-creates it.
///
/// # Example
///
/// ```rust,ignore
/// let mut patient = client.resource(
///     "Patient",
///     serde_json::json!({"name": [{"family": "Doe"}]}),
/// )?;
/// patient.save().await?;
/// assert!(patient.id().is_some());
/// ```
///
/// [`Client::resource`]: crate::Client::resource
#[derive(Debug, Clone)]
pub struct Resource {
    client: Client,
    resource_type: String,
    data: Map,
}

impl Resource {
    /// Builds a resource from raw JSON fields, normalizing nested
    /// reference-shaped sub-documents into [`Reference`] values and applying
    /// the schema gate to every top-level key.
    pub(crate) fn new(
        client: Client,
        resource_type: &str,
        fields: serde_json::Value,
    ) -> Result<Self> {
        let serde_json::Value::Object(fields) = fields else {
            return Err(Error::Argument(
                "resource fields must be a JSON object".to_string(),
            ));
        };

        let mut data = Map::with_capacity(fields.len() + 1);
        data.insert(
            "resourceType".to_string(),
            Value::String(resource_type.to_string()),
        );
        for (key, field) in fields {
            // Identity comes from the factory argument, not the payload.
            if key == "resourceType" {
                continue;
            }
            let value = transform_values(Value::from_json(field), &|value| match value {
                Value::Object(map) if is_reference_shape(&map) => {
                    let reference = Reference::from_map(client.clone(), map)?;
                    Ok(Transformed::Done(Value::Reference(reference)))
                }
                other => Ok(Transformed::Descend(other)),
            })?;
            data.insert(key, value);
        }

        let resource = Self {
            client,
            resource_type: resource_type.to_string(),
            data,
        };
        resource.validate_keys()?;
        Ok(resource)
    }

    fn validate_keys(&self) -> Result<()> {
        if self.client.schema().is_none() {
            return Ok(());
        }
        let allowed = self.root_keys();
        for key in self.data.keys() {
            if !allowed.contains(key) {
                return Err(Error::invalid_field(key, allowed));
            }
        }
        Ok(())
    }

    /// Persists the resource.
    ///
    /// Without an id this issues a create; with an id, a full replace. On
    /// success the server-confirmed `id` and `meta` overwrite the local
    /// fields and the resource is registered in the client's cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when a nested resource cannot be
    /// serialized as a pointer (unsaved, no id), and any transport error
    /// from the request.
    pub async fn save(&mut self) -> Result<()> {
        let body = self.serialize()?;
        let method = if self.id().is_some() {
            HttpMethod::Put
        } else {
            HttpMethod::Post
        };

        let data = self
            .client
            .execute(method, &self.path(), Some(&body), None)
            .await?
            .ok_or_else(|| Error::invalid_response("a resource body", "an empty response"))?;

        let meta = data
            .get("meta")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        self.data
            .insert("meta".to_string(), Value::from_json(meta));
        let id = data.get("id").cloned().unwrap_or(serde_json::Value::Null);
        self.data.insert("id".to_string(), Value::from_json(id));

        tracing::debug!(
            resource_type = self.resource_type.as_str(),
            id = self.id(),
            "resource saved"
        );
        self.client.cache_resource(self)
    }

    /// Deletes the resource from the server.
    ///
    /// The cache entry is evicted before the request is issued, so a
    /// concurrent lookup never resolves a resource whose deletion is in
    /// flight from this client's perspective. The transport failure, if any,
    /// propagates unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when the resource has no id (deleting an
    /// unsaved resource is not well-defined), and any transport error from
    /// the request.
    pub async fn delete(&self) -> Result<Option<serde_json::Value>> {
        let Some(id) = self.id() else {
            return Err(Error::Argument(
                "cannot delete a resource without an id".to_string(),
            ));
        };
        self.client.uncache_resource(&self.resource_type, id);
        tracing::debug!(
            resource_type = self.resource_type.as_str(),
            id,
            "deleting resource"
        );

        self.client
            .execute(HttpMethod::Delete, &self.path(), None, None)
            .await
    }

    /// Derives a [`Reference`] pointing at this resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the resource has no id; a reference
    /// to an unsaved resource is meaningless.
    pub fn to_reference(&self) -> Result<Reference> {
        let reference = Entity::reference(self).ok_or_else(|| {
            Error::NotFound("cannot get a reference to an unsaved resource without an id".to_string())
        })?;
        Ok(self.client.reference(reference))
    }

    /// The request path for this resource: `{resourceType}/{id}` when an id
    /// is present, the bare resource type otherwise. A `Bundle` with no id
    /// posts to the service base.
    fn path(&self) -> String {
        if let Some(id) = self.id() {
            format!("{}/{}", self.resource_type, id)
        } else if self.resource_type == "Bundle" {
            String::new()
        } else {
            self.resource_type.clone()
        }
    }
}

impl Entity for Resource {
    fn client(&self) -> &Client {
        &self.client
    }

    fn data(&self) -> &Map {
        &self.data
    }

    fn data_mut(&mut self) -> &mut Map {
        &mut self.data
    }

    fn root_keys(&self) -> HashSet<String> {
        let mut keys: HashSet<String> = self
            .client
            .schema()
            .and_then(|schema| schema.get(&self.resource_type))
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default();
        keys.extend(IDENTITY_KEYS.iter().map(ToString::to_string));
        keys
    }

    fn id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    fn resource_type(&self) -> Option<&str> {
        Some(&self.resource_type)
    }

    /// The derived reference: `{resourceType}/{id}` once the resource is
    /// persisted, absent before.
    fn reference(&self) -> Option<String> {
        self.id()
            .map(|id| format!("{}/{}", self.resource_type, id))
    }

    fn validate_write(&self, key: &str) -> Result<()> {
        if key == "resourceType" {
            return Err(Error::Argument(
                "cannot change `resourceType` after construction, create a new resource \
                 via `Client::resource` instead"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        Entity::reference(self) == Entity::reference(other)
    }
}

impl PartialEq<Reference> for Resource {
    fn eq(&self, other: &Reference) -> bool {
        Entity::reference(self) == Entity::reference(other)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Resource {}>", self.path())
    }
}
