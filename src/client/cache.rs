//! Per-client resource cache.
//!
//! A pure lookup accelerator mapping `(resourceType, id)` to the resource's
//! serialized document. Unbounded, no eviction policy: entries are added on
//! every successful materialization, removed on delete, and cleared
//! explicitly or never.
//!
//! Documents are stored instead of live [`Resource`](crate::Resource) values
//! so the cache holds no client handles; lookups rematerialize through the
//! normal construction path.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Thread-safe store mapping resource type to an id-indexed document map.
#[derive(Debug, Default)]
pub(crate) struct ResourceCache {
    entries: Mutex<HashMap<String, HashMap<String, serde_json::Value>>>,
}

impl ResourceCache {
    /// Stores a document under `(resource_type, id)`, replacing any prior
    /// entry.
    pub fn insert(&self, resource_type: &str, id: &str, document: serde_json::Value) {
        self.lock()
            .entry(resource_type.to_string())
            .or_default()
            .insert(id.to_string(), document);
    }

    /// Removes and returns the document under `(resource_type, id)`.
    pub fn remove(&self, resource_type: &str, id: &str) -> Option<serde_json::Value> {
        self.lock()
            .get_mut(resource_type)
            .and_then(|entries| entries.remove(id))
    }

    /// Returns a copy of the document under `(resource_type, id)`.
    pub fn get(&self, resource_type: &str, id: &str) -> Option<serde_json::Value> {
        self.lock()
            .get(resource_type)
            .and_then(|entries| entries.get(id))
            .cloned()
    }

    /// Clears one resource type's entries, or the whole cache.
    pub fn clear(&self, resource_type: Option<&str>) {
        let mut entries = self.lock();
        match resource_type {
            Some(resource_type) => {
                entries.remove(resource_type);
            }
            None => entries.clear(),
        }
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, serde_json::Value>>> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the map itself is still structurally sound.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
