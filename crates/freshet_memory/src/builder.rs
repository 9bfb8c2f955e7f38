// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory entry stores.
//!
//! The builder abstracts the underlying moka configuration so that the store's public
//! API never exposes moka types.

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use crate::store::InMemoryStore;

/// Builder for configuring an [`InMemoryStore`].
///
/// Every setting is optional; the default store is unbounded and never evicts on its own.
/// Any eviction configured here happens underneath the cache: an evicted entry simply
/// shows up as a miss.
///
/// # Examples
///
/// ```
/// use freshet_memory::InMemoryStore;
/// use std::time::Duration;
///
/// let store = InMemoryStore::<String, Vec<u8>>::builder()
///     .max_capacity(10_000)
///     .initial_capacity(256)
///     .time_to_idle(Duration::from_secs(600))
///     .name("http-responses")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder<K, V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for InMemoryStoreBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryStoreBuilder<K, V> {
    /// Creates a new builder for an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Bounds the number of stored entries.
    ///
    /// When the bound is reached the store evicts entries using the `TinyLFU` policy.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Pre-allocates room for `capacity` entries.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Drops entries a fixed duration after they were written.
    ///
    /// This bounds memory held by long-lived entries. It is unrelated to HTTP freshness:
    /// an entry dropped here is a miss, an entry kept past its HTTP expiration is stale.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Drops entries that have not been read or written for `duration`.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Names the store in the underlying cache's diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured store.
    #[must_use]
    pub fn build(self) -> InMemoryStore<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        InMemoryStore::from_builder(&self)
    }
}
