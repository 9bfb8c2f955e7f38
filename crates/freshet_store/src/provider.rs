// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Contracts for the vary and dependency providers.
//!
//! Both providers hold bookkeeping that the cache needs next to the entry store:
//! [`VaryProvider`] remembers which request headers made a resource's responses vary,
//! and [`DependencyProvider`] maps resource URIs to the cache keys whose stored results
//! depend on them.

use std::collections::BTreeSet;

use crate::Error;

/// Records the `Vary` header names observed for each resource.
///
/// Resource identities are opaque strings produced by the cache (method plus canonical
/// URI). Header names are stored exactly as given; the cache normalizes them before
/// calling the provider.
pub trait VaryProvider: Send + Sync {
    /// Returns the most recently recorded header names for the resource.
    ///
    /// Returns an empty set when nothing has been recorded.
    fn get_vary(&self, resource: &str) -> impl Future<Output = Result<BTreeSet<String>, Error>> + Send;

    /// Replaces the recorded header names for the resource.
    fn set_vary(&self, resource: &str, names: BTreeSet<String>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Forgets all recorded header names.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// A reverse index from a resource URI to the cache keys that depend on it.
///
/// Implementations must make `add_dependency`, `invalidate`, and `remove_key` atomic
/// with respect to each other for a given URI: `invalidate` reads and removes a URI's
/// key set in one step.
pub trait DependencyProvider<K>: Send + Sync {
    /// Records that the value stored under `key` depends on `uri`.
    fn add_dependency(&self, uri: &str, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes and returns every key that depends on `uri`.
    fn invalidate(&self, uri: &str) -> impl Future<Output = Result<Vec<K>, Error>> + Send;

    /// Removes `key` from every URI it was registered under.
    fn remove_key(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Forgets all dependencies.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;
}
