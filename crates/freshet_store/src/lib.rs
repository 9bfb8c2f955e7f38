// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Provider contracts for the `freshet` HTTP response cache.
//!
//! The cache keeps three kinds of state, each behind a pluggable provider:
//!
//! - [`EntryStore`] persists encoded cache entries (get/insert/invalidate/clear). Stores
//!   have no eviction requirements; a backend may evict whenever it likes.
//! - [`VaryProvider`] remembers which request header names a resource's responses varied on.
//! - [`DependencyProvider`] maps a resource URI to the cache keys whose results depend on it,
//!   so that a mutation can fan out invalidation.
//!
//! Stores used by the cache hold [`Envelope`]s; [`TypedStoreExt`] reads them back as
//! concrete types and distinguishes foreign values ([`ErrorKind::TypeMismatch`]) from
//! damaged ones ([`ErrorKind::CorruptEntry`]).
//!
//! # Implementing an Entry Store
//!
//! ```
//! use freshet_store::{EntryStore, Error};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct SimpleStore<K, V>(RwLock<HashMap<K, V>>);
//!
//! impl<K, V> EntryStore<K, V> for SimpleStore<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<V>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//!
//!     async fn insert(&self, key: &K, value: V) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(key.clone(), value);
//!         Ok(())
//!     }
//!
//!     async fn invalidate(&self, key: &K) -> Result<(), Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     async fn clear(&self) -> Result<(), Error> {
//!         self.0.write().unwrap().clear();
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! Enable the `dynamic-store` feature for [`DynamicStore`], which wraps any `EntryStore`
//! in a type-erased, clonable container.

pub mod error;
mod provider;
pub(crate) mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod typed;

#[cfg(any(test, feature = "dynamic-store"))]
mod dynamic;

#[cfg(any(test, feature = "dynamic-store"))]
#[doc(inline)]
pub use dynamic::{DynamicStore, DynamicStoreExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use provider::{DependencyProvider, VaryProvider};
#[doc(inline)]
pub use store::EntryStore;
#[doc(inline)]
pub use typed::{Envelope, MismatchPolicy, StoreType, TypedStoreExt};
