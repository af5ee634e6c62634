//! The client façade: configuration, factories, request plumbing and cache.
//!
//! A [`Client`] owns the connection settings (base URL, authorization,
//! optional schema, caching flag) and is the factory for every entity and
//! query in the SDK: [`Client::resource`] builds a
//! [`Resource`](crate::Resource), [`Client::resources`] starts a
//! [`SearchSet`](crate::SearchSet), [`Client::reference`] and
//! [`Client::local_reference`] build pointers.
//!
//! The handle is cheap to clone (`Arc` internally) and `Send + Sync`;
//! entities hold a clone as their non-owning back-reference. State shared
//! across clones is limited to the resource cache.
//!
//! # Example
//!
//! ```rust,ignore
//! use fhir_client::Client;
//!
//! let client = Client::builder("https://fhir.example.com")
//!     .authorization("Bearer token")
//!     .with_cache(true)
//!     .build()?;
//!
//! let patients = client.resources("Patient").search([("name", "John")]).fetch().await?;
//! ```

mod cache;
pub(crate) mod transport;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use cache::ResourceCache;
use transport::{HttpMethod, HttpTransport};

use crate::error::{Error, Result};
use crate::model::{Entity, Map, Reference, Resource};
use crate::search::{SearchParams, SearchSet};

/// Mapping from resource-type name to its permitted top-level field names.
///
/// Attaching a schema to a client turns on strict field validation for every
/// entity the client creates; without one, any key is accepted.
pub type Schema = HashMap<String, HashSet<String>>;

/// Client for a FHIR-style REST server.
///
/// One per application-level connection; stateless across requests except
/// for the resource cache.
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    base_url: String,
    authorization: Option<String>,
    schema: Option<Schema>,
    cache_enabled: bool,
    cache: ResourceCache,
    transport: HttpTransport,
}

// Verify Client is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Client>();
};

impl Client {
    /// Creates a new builder for constructing a `Client`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fhir_client::Client;
    ///
    /// let client = Client::builder("https://fhir.example.com")
    ///     .with_cache(true)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(client.base_url(), "https://fhir.example.com");
    /// ```
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Returns the server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the schema, if one was configured.
    pub(crate) fn schema(&self) -> Option<&Schema> {
        self.inner.schema.as_ref()
    }

    /// Builds a [`Resource`] of the given type from raw JSON fields.
    ///
    /// Nested reference-shaped sub-documents are recursively converted into
    /// [`Reference`] values; when the client carries a schema, every
    /// top-level key is validated against it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when `resource_type` is empty or `fields`
    /// is not a JSON object, and [`Error::InvalidField`] on a schema
    /// violation.
    pub fn resource(&self, resource_type: &str, fields: serde_json::Value) -> Result<Resource> {
        if resource_type.is_empty() {
            return Err(Error::Argument("`resource_type` is required".to_string()));
        }
        Resource::new(self.clone(), resource_type, fields)
    }

    /// Starts a [`SearchSet`] over the given resource type.
    #[must_use]
    pub fn resources(&self, resource_type: &str) -> SearchSet {
        SearchSet::new(self.clone(), resource_type)
    }

    /// Builds a [`Reference`] from a reference string.
    ///
    /// The string may be local (`Patient/1`) or external (a full URL);
    /// external references expose no type or id and cannot be resolved.
    #[must_use]
    pub fn reference(&self, reference: impl Into<String>) -> Reference {
        Reference::from_parts(self.clone(), reference.into())
    }

    /// Builds a local [`Reference`] from a resource type and id.
    #[must_use]
    pub fn local_reference(&self, resource_type: &str, id: &str) -> Reference {
        Reference::from_parts(self.clone(), format!("{resource_type}/{id}"))
    }

    /// Builds a [`Reference`] from an already-shaped field map; used by
    /// construction-time normalization.
    pub(crate) fn reference_from_map(&self, map: Map) -> Result<Reference> {
        Reference::from_map(self.clone(), map)
    }

    /// Clears the resource cache, for one resource type or entirely.
    pub fn clear_cache(&self, resource_type: Option<&str>) {
        if !self.inner.cache_enabled {
            return;
        }
        self.inner.cache.clear(resource_type);
    }

    /// Registers a resource's serialized document in the cache.
    ///
    /// A no-op when caching is disabled or the resource has no id.
    pub(crate) fn cache_resource(&self, resource: &Resource) -> Result<()> {
        if !self.inner.cache_enabled {
            return Ok(());
        }
        let (Some(resource_type), Some(id)) = (resource.resource_type(), resource.id()) else {
            return Ok(());
        };
        let document = resource.serialize()?;
        self.inner.cache.insert(resource_type, id, document);
        Ok(())
    }

    /// Evicts a cache entry.
    pub(crate) fn uncache_resource(&self, resource_type: &str, id: &str) {
        if !self.inner.cache_enabled {
            return;
        }
        self.inner.cache.remove(resource_type, id);
    }

    /// Looks up a cached resource, rematerializing it from its stored
    /// document.
    pub(crate) fn cached_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<Resource>> {
        if !self.inner.cache_enabled {
            return Ok(None);
        }
        self.inner
            .cache
            .get(resource_type, id)
            .map(|document| self.resource(resource_type, document))
            .transpose()
    }

    /// Issues a request against `{base_url}/{path}` with `_format=json`
    /// injected into the query parameters.
    pub(crate) async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&serde_json::Value>,
        params: Option<&SearchParams>,
    ) -> Result<Option<serde_json::Value>> {
        let mut params = params.cloned().unwrap_or_default();
        params.set("_format", vec!["json".to_string()]);

        let url = format!("{}/{}?{}", self.inner.base_url, path, params.encode());
        self.inner
            .transport
            .request(method, &url, body, self.inner.authorization.as_deref())
            .await
    }

    /// Fetches a document with GET, failing on an empty response body.
    pub(crate) async fn fetch_document(
        &self,
        path: &str,
        params: Option<&SearchParams>,
    ) -> Result<serde_json::Value> {
        self.execute(HttpMethod::Get, path, None, params)
            .await?
            .ok_or_else(|| Error::invalid_response("a JSON body", "an empty response"))
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Client {}>", self.inner.base_url)
    }
}

/// Builder for [`Client`] instances.
///
/// # Example
///
/// ```rust
/// use fhir_client::Client;
/// use std::collections::{HashMap, HashSet};
///
/// let schema = HashMap::from([(
///     "Patient".to_string(),
///     HashSet::from(["name".to_string(), "birthDate".to_string()]),
/// )]);
///
/// let client = Client::builder("https://fhir.example.com/")
///     .authorization("Bearer token")
///     .schema(schema)
///     .with_cache(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    authorization: Option<String>,
    schema: Option<Schema>,
    with_cache: bool,
}

impl ClientBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            authorization: None,
            schema: None,
            with_cache: false,
        }
    }

    /// Sets the authorization header value sent with every request, e.g.
    /// `"Bearer <token>"`. The SDK treats it as opaque.
    #[must_use]
    pub fn authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    /// Attaches a schema, turning on strict top-level field validation for
    /// every entity this client creates.
    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Enables or disables the resource cache. Disabled by default.
    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.with_cache = enabled;
        self
    }

    /// Builds the client.
    ///
    /// The base URL is normalized by trimming trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when the base URL is empty.
    pub fn build(self) -> Result<Client> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Argument("base URL must not be empty".to_string()));
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                authorization: self.authorization,
                schema: self.schema,
                cache_enabled: self.with_cache,
                cache: ResourceCache::default(),
                transport: HttpTransport::new(),
            }),
        })
    }
}
