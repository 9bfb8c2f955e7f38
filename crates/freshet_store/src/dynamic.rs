// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic entry store wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use crate::{EntryStore, Error, store::DynEntryStore};

/// Extension trait for converting any `EntryStore` into a `DynamicStore`.
///
/// This trait is automatically implemented for all types that implement `EntryStore`.
///
/// # Examples
///
/// ```
/// use freshet_store::{DynamicStore, DynamicStoreExt, EntryStore};
///
/// fn erase<S>(store: S) -> DynamicStore<String, Vec<u8>>
/// where
///     S: EntryStore<String, Vec<u8>> + 'static,
/// {
///     store.into_dynamic()
/// }
/// ```
pub trait DynamicStoreExt<K, V>: Sized {
    /// Converts this store into a `DynamicStore`.
    fn into_dynamic(self) -> DynamicStore<K, V>;
}

impl<K, V, S> DynamicStoreExt<K, V> for S
where
    S: EntryStore<K, V> + 'static,
{
    fn into_dynamic(self) -> DynamicStore<K, V> {
        DynamicStore::new(self)
    }
}

/// A clonable entry store with type erasure.
///
/// `DynamicStore` wraps a trait object in an `Arc` so the concrete backend can be chosen
/// at runtime (for example from configuration) while the cache keeps a single type.
pub struct DynamicStore<K, V>(Arc<DynEntryStore<'static, K, V>>);

impl<K, V> DynamicStore<K, V> {
    pub(crate) fn new<S>(store: S) -> Self
    where
        S: EntryStore<K, V> + Send + Sync + 'static,
    {
        Self(DynEntryStore::new_arc(store))
    }
}

impl<K, V> Debug for DynamicStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicStore").finish()
    }
}

impl<K, V> Clone for DynamicStore<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> EntryStore<K, V> for DynamicStore<K, V>
where
    K: Sync,
    V: Send,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        self.0.get(key).await
    }

    async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
        self.0.insert(key, value).await
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        self.0.invalidate(key).await
    }

    async fn clear(&self) -> Result<(), Error> {
        self.0.clear().await
    }

    fn len(&self) -> Option<u64> {
        self.0.len()
    }

    fn is_empty(&self) -> Option<bool> {
        self.0.is_empty()
    }
}
