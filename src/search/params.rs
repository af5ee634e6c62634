//! Multi-valued search parameters and query-string encoding.
//!
//! [`SearchParams`] is an ordered mapping from parameter name to a list of
//! values. Every component that issues a request encodes its parameters
//! through [`SearchParams::encode`], which emits one `key=value` pair per
//! value and keeps the separators FHIR search syntax relies on (`:`, `,`,
//! `/`) unescaped.

use indexmap::IndexMap;

/// An ordered, multi-valued parameter mapping.
///
/// Insertion order is preserved so encoded query strings are deterministic.
/// Values are stored as strings; callers coerce scalars before insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    entries: IndexMap<String, Vec<String>>,
}

impl SearchParams {
    /// Creates an empty parameter mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when no parameters are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value list for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Replaces the value list for `key`.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.entries.insert(key.into(), values);
    }

    /// Appends `values` to the value list for `key`, creating it if absent.
    pub fn append(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.entries.entry(key.into()).or_default().extend(values);
    }

    /// Iterates over `(key, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Encodes the parameters as a query string.
    ///
    /// Each value gets its own `key=value` pair, in insertion order:
    /// `{_count: [5], _sort: ["name"]}` becomes `_count=5&_sort=name`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut pairs = Vec::new();
        for (key, values) in &self.entries {
            for value in values {
                pairs.push(format!(
                    "{}={}",
                    encode_component(key),
                    encode_component(value)
                ));
            }
        }
        pairs.join("&")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.append(key.into(), vec![value.into()]);
        }
        params
    }
}

/// Percent-encodes a single query-string component.
///
/// `:`, `,` and `/` are restored after encoding: they are legal in query
/// strings and FHIR search keys (`_has:Observation:patient`), composite
/// values (`a,b`) and reference values (`Patient/1`) use them as syntax.
fn encode_component(component: &str) -> String {
    urlencoding::encode(component)
        .replace("%3A", ":")
        .replace("%2C", ",")
        .replace("%2F", "/")
}
