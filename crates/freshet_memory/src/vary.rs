// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use freshet_store::{Error, VaryProvider};

/// Per-resource `Vary` records held in a concurrent map.
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVaryProvider {
    records: Arc<DashMap<String, BTreeSet<String>>>,
}

impl InMemoryVaryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of resources with a recorded `Vary` set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl VaryProvider for InMemoryVaryProvider {
    async fn get_vary(&self, resource: &str) -> Result<BTreeSet<String>, Error> {
        Ok(self.records.get(resource).map(|names| names.clone()).unwrap_or_default())
    }

    async fn set_vary(&self, resource: &str, names: BTreeSet<String>) -> Result<(), Error> {
        if names.is_empty() {
            self.records.remove(resource);
        } else {
            self.records.insert(resource.to_owned(), names);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn unknown_resource_has_empty_set() {
        block_on(async {
            let provider = InMemoryVaryProvider::new();
            assert!(provider.get_vary("GET https://example.com/").await.unwrap().is_empty());
        });
    }

    #[test]
    fn set_replaces_previous_record() {
        block_on(async {
            let provider = InMemoryVaryProvider::new();
            provider.set_vary("r", names(&["accept"])).await.unwrap();
            provider.set_vary("r", names(&["accept-language", "x-tenant"])).await.unwrap();

            assert_eq!(provider.get_vary("r").await.unwrap(), names(&["accept-language", "x-tenant"]));
            assert_eq!(provider.len(), 1);
        });
    }

    #[test]
    fn empty_set_removes_record() {
        block_on(async {
            let provider = InMemoryVaryProvider::new();
            provider.set_vary("r", names(&["accept"])).await.unwrap();
            provider.set_vary("r", BTreeSet::new()).await.unwrap();

            assert!(provider.is_empty());
        });
    }

    #[test]
    fn clones_share_records() {
        block_on(async {
            let provider = InMemoryVaryProvider::new();
            let clone = provider.clone();
            provider.set_vary("r", names(&["accept"])).await.unwrap();

            assert_eq!(clone.get_vary("r").await.unwrap(), names(&["accept"]));
            clone.clear().await.unwrap();
            assert!(provider.is_empty());
        });
    }
}
