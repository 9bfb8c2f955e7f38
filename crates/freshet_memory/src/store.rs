// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory entry store backed by moka.

use std::hash::Hash;

use freshet_store::{EntryStore, Error};
use moka::future::Cache;

use crate::builder::InMemoryStoreBuilder;

/// An in-memory entry store backed by moka.
///
/// Clones share the same underlying storage.
///
/// # Examples
///
/// ```
/// use freshet_memory::InMemoryStore;
/// use freshet_store::EntryStore;
/// # futures::executor::block_on(async {
///
/// let store = InMemoryStore::<String, i32>::new();
///
/// store.insert(&"key".to_string(), 42).await?;
/// assert_eq!(store.get(&"key".to_string()).await?, Some(42));
/// # Ok::<(), freshet_store::Error>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
}

impl<K, V> Default for InMemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new store holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring a store.
    #[must_use]
    pub fn builder() -> InMemoryStoreBuilder<K, V> {
        InMemoryStoreBuilder::new()
    }

    pub(crate) fn from_builder(builder: &InMemoryStoreBuilder<K, V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
        }
    }
}

impl<K, V> EntryStore<K, V> for InMemoryStore<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
        self.inner.insert(key.clone(), value).await;
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
