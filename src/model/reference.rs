//! Reference entities: pointers to resources.
//!
//! A [`Reference`] points at a resource either locally (a
//! `{resourceType}/{id}` reference string, resolvable against the owning
//! client) or externally (an opaque reference such as a full URL, not
//! resolvable). This module also hosts the reference-shape predicate the
//! protocol binding supplies to the generic tree-walk.

use std::collections::HashSet;
use std::fmt;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::model::entity::Entity;
use crate::model::value::{Map, Value};
use crate::model::Resource;

/// The top-level keys a reference document may carry.
const REFERENCE_KEYS: [&str; 2] = ["reference", "display"];

/// Returns true when a field map has the protocol's reference shape:
/// a `reference` key and nothing beyond `reference`/`display`.
pub(crate) fn is_reference_shape(map: &Map) -> bool {
    map.contains_key("reference")
        && map
            .keys()
            .all(|key| REFERENCE_KEYS.contains(&key.as_str()))
}

/// A pointer to a resource.
///
/// Local references (`Patient/1`) expose their `resource_type` and `id` and
/// resolve to a [`Resource`] through [`Reference::to_resource`]; external
/// references (full URLs, display-only pointers) expose neither and fail
/// resolution.
///
/// # Example
///
/// ```rust,ignore
/// let reference = client.local_reference("Patient", "1");
/// assert!(reference.is_local());
///
/// let patient = reference.to_resource().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Reference {
    client: Client,
    data: Map,
}

impl Reference {
    /// Builds a reference from an already-shaped field map, applying the
    /// schema gate.
    pub(crate) fn from_map(client: Client, data: Map) -> Result<Self> {
        if !data.contains_key("reference") {
            return Err(Error::Argument(
                "a reference requires a `reference` value".to_string(),
            ));
        }
        let reference = Self { client, data };
        for key in reference.data.keys() {
            reference.check_key(key)?;
        }
        Ok(reference)
    }

    /// Builds a reference from a reference string; infallible because the
    /// resulting document always has the reference shape.
    pub(crate) fn from_parts(client: Client, reference: String) -> Self {
        let mut data = Map::with_capacity(1);
        data.insert("reference".to_string(), Value::String(reference));
        Self { client, data }
    }

    /// Returns the reference string.
    #[must_use]
    pub fn reference_str(&self) -> Option<&str> {
        self.data.get("reference").and_then(Value::as_str)
    }

    /// Returns true when the reference is resolvable against the owning
    /// client: exactly one `/`, separating resource type from id.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.reference_str()
            .is_some_and(|reference| reference.matches('/').count() == 1)
    }

    /// Resolves the reference to a [`Resource`].
    ///
    /// A cached resource is returned without a network round trip; a cache
    /// miss fetches by id through the owning client and caches the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the reference is not local, and any
    /// transport or response-shape error from the fetch.
    pub async fn to_resource(&self) -> Result<Resource> {
        self.resolve(false).await
    }

    /// Resolves the reference to a [`Resource`], bypassing the cache.
    ///
    /// Always performs the network round trip; the fetched resource still
    /// replaces the cached entry.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Reference::to_resource`].
    pub async fn to_resource_uncached(&self) -> Result<Resource> {
        self.resolve(true).await
    }

    async fn resolve(&self, skip_cache: bool) -> Result<Resource> {
        let (Some(resource_type), Some(id)) = (self.resource_type(), self.id()) else {
            return Err(Error::NotFound(format!(
                "cannot resolve non-local reference `{}`",
                self.reference_str().unwrap_or_default()
            )));
        };

        if !skip_cache {
            if let Some(resource) = self.client.cached_resource(resource_type, id)? {
                tracing::debug!(resource_type, id, "reference resolved from cache");
                return Ok(resource);
            }
        }

        self.client.resources(resource_type).get(id).await
    }
}

impl Entity for Reference {
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
        REFERENCE_KEYS.iter().map(ToString::to_string).collect()
    }

    /// The id, when the reference is local.
    fn id(&self) -> Option<&str> {
        self.local_segments().map(|(_, id)| id)
    }

    /// The resource type, when the reference is local.
    fn resource_type(&self) -> Option<&str> {
        self.local_segments().map(|(resource_type, _)| resource_type)
    }

    fn reference(&self) -> Option<String> {
        self.reference_str().map(ToString::to_string)
    }
}

impl Reference {
    fn local_segments(&self) -> Option<(&str, &str)> {
        let reference = self.reference_str()?;
        if reference.matches('/').count() != 1 {
            return None;
        }
        reference.split_once('/')
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        Entity::reference(self) == Entity::reference(other)
    }
}

impl PartialEq<Resource> for Reference {
    fn eq(&self, other: &Resource) -> bool {
        Entity::reference(self) == Entity::reference(other)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Reference {}>", self.reference_str().unwrap_or_default())
    }
}
