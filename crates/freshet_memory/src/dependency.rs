// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use freshet_store::{DependencyProvider, Error};

/// A sharded reverse index from resource URIs to dependent cache keys.
///
/// The forward map (`uri -> keys`) answers invalidation; the backward map
/// (`key -> uris`) lets a key be deregistered without scanning every URI. Each update
/// of a single URI bucket happens under that bucket's shard lock, so `invalidate`
/// takes the whole key set in one step and a concurrent `add_dependency` lands either
/// before it (and is returned) or after it (and survives).
///
/// Clones share the same index.
#[derive(Debug)]
pub struct InMemoryDependencyIndex<K>
where
    K: Hash + Eq,
{
    by_uri: Arc<DashMap<String, HashSet<K>>>,
    by_key: Arc<DashMap<K, HashSet<String>>>,
}

impl<K> Clone for InMemoryDependencyIndex<K>
where
    K: Hash + Eq,
{
    fn clone(&self) -> Self {
        Self {
            by_uri: Arc::clone(&self.by_uri),
            by_key: Arc::clone(&self.by_key),
        }
    }
}

impl<K> Default for InMemoryDependencyIndex<K>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self {
            by_uri: Arc::new(DashMap::new()),
            by_key: Arc::new(DashMap::new()),
        }
    }
}

impl<K> InMemoryDependencyIndex<K>
where
    K: Clone + Hash + Eq,
{
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the keys currently registered under `uri` without removing them.
    #[must_use]
    pub fn keys_for(&self, uri: &str) -> Vec<K> {
        self.by_uri
            .get(uri)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of URIs with at least one registered key.
    #[must_use]
    pub fn uri_count(&self) -> usize {
        self.by_uri.len()
    }

    fn forget_uri_for_key(&self, key: &K, uri: &str) {
        if let Some(mut uris) = self.by_key.get_mut(key) {
            uris.remove(uri);
        }
        self.by_key.remove_if(key, |_, uris| uris.is_empty());
    }
}

impl<K> DependencyProvider<K> for InMemoryDependencyIndex<K>
where
    K: Clone + Hash + Eq + Send + Sync,
{
    async fn add_dependency(&self, uri: &str, key: &K) -> Result<(), Error> {
        // The two maps are updated separately. A concurrent `remove_key` for the same key
        // can leave a forward record without its reverse; `invalidate` still drains it.
        self.by_uri.entry(uri.to_owned()).or_default().insert(key.clone());
        self.by_key.entry(key.clone()).or_default().insert(uri.to_owned());
        Ok(())
    }

    async fn invalidate(&self, uri: &str) -> Result<Vec<K>, Error> {
        let Some((_, keys)) = self.by_uri.remove(uri) else {
            return Ok(Vec::new());
        };

        for key in &keys {
            self.forget_uri_for_key(key, uri);
        }

        Ok(keys.into_iter().collect())
    }

    async fn remove_key(&self, key: &K) -> Result<(), Error> {
        let Some((_, uris)) = self.by_key.remove(key) else {
            return Ok(());
        };

        for uri in &uris {
            if let Some(mut keys) = self.by_uri.get_mut(uri.as_str()) {
                keys.remove(key);
            }
            self.by_uri.remove_if(uri.as_str(), |_, keys| keys.is_empty());
        }

        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.by_uri.clear();
        self.by_key.clear();
        Ok(())
    }
}
