// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for entry storage backends.
//!
//! [`EntryStore`] is the persistence contract of the HTTP cache. Backends are opaque
//! key/value stores without any eviction policy requirements; the cache layers
//! freshness, revalidation, and invalidation on top.

use crate::Error;

/// Trait for entry storage backends.
///
/// Implement this trait to plug a custom backend (memory, disk, remote) into the cache.
/// All four core methods are required: `get`, `insert`, `invalidate`, and `clear`.
/// Only `len` and `is_empty` have default implementations:
/// - `len`: Returns `None` (not all stores track size)
/// - `is_empty`: Delegates to `len`
///
/// Failures are reported through [`Error`]; the cache decides whether a failure is
/// surfaced to the caller or downgraded to a miss.
#[cfg_attr(
    any(test, feature = "dynamic-store"),
    dynosaur::dynosaur(pub(crate) DynEntryStore = dyn(box) EntryStore, bridge(none))
)]
pub trait EntryStore<K, V>: Send + Sync {
    /// Gets a value, returning `None` on a miss.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Inserts a value, replacing any previous value for the key.
    fn insert(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the value for the key. Removing a missing key is not an error.
    fn invalidate(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes all values.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the number of stored values, if supported.
    ///
    /// Returns `None` for implementations that don't track size.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the store contains no values.
    ///
    /// Returns `None` for implementations that don't track size.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}
