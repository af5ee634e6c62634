//! Search query construction and execution.
//!
//! A [`SearchSet`] accumulates filter, sort and paging parameters through
//! chainable refinements; every refinement deep-copies the parameters and
//! returns a new instance, so prior query values stay valid after a caller
//! branches into multiple queries from the same base. No network state is
//! held: a request happens only on the terminal operations
//! ([`SearchSet::fetch`], [`SearchSet::fetch_all`], [`SearchSet::get`],
//! [`SearchSet::first`], [`SearchSet::count`]).
//!
//! # Example
//!
//! ```rust,ignore
//! let base = client.resources("Patient").search([("name", "John")]);
//!
//! // Refinements never mutate `base`.
//! let page = base.sort(&["-birthDate"]).limit(20).page(2);
//! let patients = page.fetch().await?;
//!
//! let total = base.count().await?;
//! ```

mod params;

pub use params::SearchParams;

use std::fmt;

use serde::Deserialize;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::model::{Entity, Resource};

/// Wire shape of a search response envelope.
#[derive(Debug, Deserialize)]
struct BundleDocument {
    #[serde(rename = "resourceType")]
    resource_type: Option<String>,
    #[serde(default)]
    entry: Vec<BundleEntry>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BundleEntry {
    resource: Option<serde_json::Value>,
}

impl BundleDocument {
    fn parse(document: serde_json::Value) -> Result<Self> {
        serde_json::from_value(document).map_err(|e| {
            Error::invalid_response("a Bundle envelope", format!("a malformed document ({e})"))
        })
    }
}

/// An immutable accumulator of search parameters for one resource type.
///
/// Obtained through [`Client::resources`](crate::Client::resources).
#[derive(Debug, Clone)]
pub struct SearchSet {
    client: Client,
    resource_type: String,
    params: SearchParams,
    skip_caching: bool,
}

impl SearchSet {
    pub(crate) fn new(client: Client, resource_type: &str) -> Self {
        Self {
            client,
            resource_type: resource_type.to_string(),
            params: SearchParams::new(),
            skip_caching: false,
        }
    }

    /// Returns the resource type this query targets.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the accumulated parameters.
    #[must_use]
    pub const fn params(&self) -> &SearchParams {
        &self.params
    }

    /// The single refinement primitive: deep-copies the current parameters
    /// and merges `entries` into the copy.
    ///
    /// With `override_values` each incoming key replaces its prior value
    /// list; without it the incoming values are appended. All other
    /// refinements are built on this.
    #[must_use]
    pub fn clone_with(
        &self,
        override_values: bool,
        entries: impl IntoIterator<Item = (String, Vec<String>)>,
    ) -> Self {
        let mut params = self.params.clone();
        for (key, values) in entries {
            if override_values {
                params.set(key, values);
            } else {
                params.append(key, values);
            }
        }
        Self {
            client: self.client.clone(),
            resource_type: self.resource_type.clone(),
            params,
            skip_caching: self.skip_caching,
        }
    }

    /// Appends search criteria.
    ///
    /// Repeated keys accumulate rather than replace, so
    /// `search([("name", "a")]).search([("name", "b")])` sends both values.
    #[must_use]
    pub fn search<K, V, I>(&self, params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.clone_with(
            false,
            params
                .into_iter()
                .map(|(key, value)| (key.into(), vec![value.into()])),
        )
    }

    /// Sets the page size (`_count`), replacing any prior limit.
    #[must_use]
    pub fn limit(&self, limit: u32) -> Self {
        self.clone_with(true, [("_count".to_string(), vec![limit.to_string()])])
    }

    /// Sets the page number, replacing any prior page.
    #[must_use]
    pub fn page(&self, page: u32) -> Self {
        self.clone_with(true, [("page".to_string(), vec![page.to_string()])])
    }

    /// Sets the sort keys (`_sort`), replacing any prior sort.
    #[must_use]
    pub fn sort(&self, keys: &[&str]) -> Self {
        self.clone_with(true, [("_sort".to_string(), vec![keys.join(",")])])
    }

    /// Restricts returned fields (`_elements`), replacing any prior value.
    ///
    /// Unless excluding, `id` and `resourceType` are implicitly added so the
    /// server can always return identity fields; when `exclude` is true the
    /// value is prefixed with `-` and nothing is added.
    #[must_use]
    pub fn elements(&self, attrs: &[&str], exclude: bool) -> Self {
        let mut attrs: Vec<&str> = attrs.to_vec();
        if !exclude {
            for identity in ["id", "resourceType"] {
                if !attrs.contains(&identity) {
                    attrs.push(identity);
                }
            }
        }
        let value = format!("{}{}", if exclude { "-" } else { "" }, attrs.join(","));
        self.clone_with(true, [("_elements".to_string(), vec![value])])
    }

    /// Adds an `_include` parameter:
    /// `_include[:recursive]={resourceType}:{attr}[:{targetResourceType}]`.
    #[must_use]
    pub fn include(
        &self,
        resource_type: &str,
        attr: &str,
        target_resource_type: Option<&str>,
        recursive: bool,
    ) -> Self {
        let key = if recursive {
            "_include:recursive"
        } else {
            "_include"
        };
        let mut value = format!("{resource_type}:{attr}");
        if let Some(target) = target_resource_type {
            value.push(':');
            value.push_str(target);
        }
        self.clone_with(false, [(key.to_string(), vec![value])])
    }

    /// Adds reverse-chaining criteria (`_has`).
    ///
    /// `chain` alternates resource type and attribute; each `(key, value)`
    /// pair becomes one `_has:{type}:{attr}[:...]:{key}={value}` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Argument`] when `chain` has an odd number of
    /// segments; no request is ever issued for a malformed chain.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let audited = client
    ///     .resources("Patient")
    ///     .has(&["Observation", "patient"], &[("code", "8867-4")])?;
    /// ```
    pub fn has(&self, chain: &[&str], params: &[(&str, &str)]) -> Result<Self> {
        if chain.len() % 2 != 0 {
            return Err(Error::Argument(
                "`has` requires an even number of chain segments, for example: \
                 `has(&[\"Observation\", \"patient\"], &[(\"user\", \"id\")])`"
                    .to_string(),
            ));
        }
        let key_part = chain
            .chunks(2)
            .map(|pair| format!("_has:{}", pair.join(":")))
            .collect::<Vec<_>>()
            .join(":");

        Ok(self.clone_with(
            false,
            params
                .iter()
                .map(|(key, value)| (format!("{key_part}:{key}"), vec![(*value).to_string()])),
        ))
    }

    /// Reverse include is deliberately unsupported: reverse-included
    /// resources would not be resolvable against the local object graph, so
    /// the operation fails explicitly rather than half-working.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    pub fn revinclude(
        &self,
        _resource_type: &str,
        _attr: &str,
        _recursive: bool,
    ) -> Result<Self> {
        Err(Error::NotSupported("revinclude"))
    }

    /// Disables caching for resources materialized by this query's terminal
    /// operations.
    #[must_use]
    pub fn skip_caching(&self) -> Self {
        Self {
            client: self.client.clone(),
            resource_type: self.resource_type.clone(),
            params: self.params.clone(),
            skip_caching: true,
        }
    }

    /// Executes the search and returns one page of resources.
    ///
    /// The response must be a `Bundle`; each entry is materialized into a
    /// [`Resource`] and registered in the cache. The result keeps only
    /// resources of this query's type, guarding against servers that mix
    /// included resources into the same bundle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] when the response is not a
    /// `Bundle`, and any transport or materialization error.
    pub async fn fetch(&self) -> Result<Vec<Resource>> {
        let document = self
            .client
            .fetch_document(&self.resource_type, Some(&self.params))
            .await?;
        let bundle = BundleDocument::parse(document)?;

        if bundle.resource_type.as_deref() != Some("Bundle") {
            return Err(Error::invalid_response(
                "Bundle",
                bundle.resource_type.unwrap_or_else(|| "nothing".to_string()),
            ));
        }

        let mut resources = Vec::new();
        for entry in bundle.entry {
            let data = entry.resource.ok_or_else(|| {
                Error::invalid_response(
                    "a Bundle entry with a `resource`",
                    "an entry without one",
                )
            })?;
            let resource = self.materialize(data)?;
            if resource.resource_type() == Some(self.resource_type.as_str()) {
                resources.push(resource);
            }
        }
        tracing::debug!(
            resource_type = self.resource_type.as_str(),
            count = resources.len(),
            "fetched search page"
        );
        Ok(resources)
    }

    /// Fetches every page, sequentially, until the first empty page.
    ///
    /// Page N+1 is never requested before page N's results are known; the
    /// result equals the concatenation of `page(1).fetch()`,
    /// `page(2).fetch()`, … up to the first empty page.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SearchSet::fetch`], for any page.
    pub async fn fetch_all(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut page = 1;
        loop {
            let next = self.page(page).fetch().await?;
            if next.is_empty() {
                break;
            }
            resources.extend(next);
            page += 1;
        }
        Ok(resources)
    }

    /// Fetches a single resource by id, bypassing the bundle search path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the server reports a 404 and
    /// [`Error::InvalidResponse`] when the returned document's
    /// `resourceType` does not match this query's type.
    pub async fn get(&self, id: &str) -> Result<Resource> {
        let path = format!("{}/{}", self.resource_type, id);
        let data = self.client.fetch_document(&path, None).await?;

        let declared = data
            .get("resourceType")
            .and_then(serde_json::Value::as_str);
        if declared != Some(self.resource_type.as_str()) {
            return Err(Error::invalid_response(
                self.resource_type.clone(),
                declared.unwrap_or("nothing"),
            ));
        }
        self.materialize(data)
    }

    /// Returns the first matching resource, or `None` when the search is
    /// empty.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SearchSet::fetch`].
    pub async fn first(&self) -> Result<Option<Resource>> {
        Ok(self.limit(1).fetch().await?.into_iter().next())
    }

    /// Returns the server-reported total for the current criteria.
    ///
    /// Overlays `_count=1&_totalMethod=count` on the accumulated parameters;
    /// no resources are materialized and the cache is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] when the response carries no
    /// `total`, and any transport error.
    pub async fn count(&self) -> Result<u64> {
        let refined = self.clone_with(
            true,
            [
                ("_count".to_string(), vec!["1".to_string()]),
                ("_totalMethod".to_string(), vec!["count".to_string()]),
            ],
        );
        let document = self
            .client
            .fetch_document(&self.resource_type, Some(&refined.params))
            .await?;

        BundleDocument::parse(document)?.total.ok_or_else(|| {
            Error::invalid_response("a Bundle with a `total`", "a response without one")
        })
    }

    /// Materializes a raw document into a [`Resource`], registering it in
    /// the cache unless this query skips caching.
    fn materialize(&self, data: serde_json::Value) -> Result<Resource> {
        let resource_type = data
            .get("resourceType")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                Error::Argument("`resourceType` is required to materialize a resource".to_string())
            })?
            .to_string();

        let resource = self.client.resource(&resource_type, data)?;
        if !self.skip_caching {
            self.client.cache_resource(&resource)?;
        }
        Ok(resource)
    }
}

impl fmt::Display for SearchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<SearchSet {}?{}>",
            self.resource_type,
            self.params.encode()
        )
    }
}
