// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use freshet_store::{DependencyProvider, Error};
use http::Uri;

use crate::key::{CacheKey, canonical_uri};

/// A reverse index from resource URIs to the cache keys that depend on them.
///
/// URIs are canonicalized the same way resource identities are, so `https://A.com:443/x`
/// and `https://a.com/x` name one bucket.
#[derive(Debug, Clone)]
pub struct DependencyIndex<D> {
    provider: D,
}

impl<D> DependencyIndex<D>
where
    D: DependencyProvider<CacheKey>,
{
    /// Wraps a dependency provider.
    #[must_use]
    pub fn new(provider: D) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &D {
        &self.provider
    }

    /// Records that `key` depends on `uri`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn register(&self, uri: &Uri, key: &CacheKey) -> Result<(), Error> {
        self.register_canonical(&canonical_uri(uri), key).await
    }

    pub(crate) async fn register_canonical(&self, uri: &str, key: &CacheKey) -> Result<(), Error> {
        self.provider.add_dependency(uri, key).await
    }

    /// Removes and returns every key that depends on `uri`.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn invalidate(&self, uri: &Uri) -> Result<Vec<CacheKey>, Error> {
        self.invalidate_canonical(&canonical_uri(uri)).await
    }

    pub(crate) async fn invalidate_canonical(&self, uri: &str) -> Result<Vec<CacheKey>, Error> {
        self.provider.invalidate(uri).await
    }

    /// Removes `key` from every URI bucket.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn deregister(&self, key: &CacheKey) -> Result<(), Error> {
        self.provider.remove_key(key).await
    }

    /// Forgets every dependency.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn clear(&self) -> Result<(), Error> {
        self.provider.clear().await
    }
}
