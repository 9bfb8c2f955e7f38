// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock entry store for testing.
//!
//! This module provides `MockStore`, an in-memory store that records every operation
//! and supports failure injection for exercising the cache's error paths.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{EntryStore, Error};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// An insert operation was performed with the given key and value.
    Insert {
        /// The key that was written.
        key: K,
        /// The value that was written.
        value: V,
    },
    /// An invalidate operation was performed with the given key.
    Invalidate(K),
    /// A clear operation was performed.
    Clear,
}

type FailPredicate<K, V> = Box<dyn Fn(&StoreOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock store for testing.
///
/// Values live in memory; every operation is recorded and can be made to fail on demand.
///
/// # Examples
///
/// ```
/// use freshet_store::{EntryStore, testing::{MockStore, StoreOp}};
///
/// # futures::executor::block_on(async {
/// let store = MockStore::<String, i32>::new();
///
/// store.insert(&"key".to_string(), 42).await.unwrap();
/// assert_eq!(store.get(&"key".to_string()).await.unwrap(), Some(42));
///
/// // Fail reads of one key only
/// store.fail_when(|op| matches!(op, StoreOp::Get(k) if k == "key"));
/// assert!(store.get(&"key".to_string()).await.is_err());
/// assert!(store.get(&"other".to_string()).await.is_ok());
/// # });
/// ```
pub struct MockStore<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<StoreOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockStore<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockStore<K, V> {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockStore<K, V>
where
    K: Eq + Hash,
{
    /// Returns the number of stored values.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the store holds a value for the key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Writes a value directly, bypassing recording and failure injection.
    ///
    /// Useful for seeding damaged or foreign values.
    pub fn seed(&self, key: K, value: V) {
        self.data.lock().insert(key, value);
    }
}

impl<K, V> MockStore<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines which operations fail.
    ///
    /// Failing operations are still recorded but leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &StoreOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K, V> EntryStore<K, V> for MockStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, Error> {
        let op = StoreOp::Get(key.clone());
        let fail = self.should_fail(&op);
        self.record(op);
        if fail {
            return Err(Error::provider_failure("mock: get failed"));
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
        let op = StoreOp::Insert {
            key: key.clone(),
            value: value.clone(),
        };
        let fail = self.should_fail(&op);
        self.record(op);
        if fail {
            return Err(Error::provider_failure("mock: insert failed"));
        }
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }

    async fn invalidate(&self, key: &K) -> Result<(), Error> {
        let op = StoreOp::Invalidate(key.clone());
        let fail = self.should_fail(&op);
        self.record(op);
        if fail {
            return Err(Error::provider_failure("mock: invalidate failed"));
        }
        self.data.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let op = StoreOp::Clear;
        let fail = self.should_fail(&op);
        self.record(op);
        if fail {
            return Err(Error::provider_failure("mock: clear failed"));
        }
        self.data.lock().clear();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}
