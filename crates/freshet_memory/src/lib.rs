// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory providers for the `freshet` HTTP response cache.
//!
//! This crate provides the reference implementations of the provider contracts defined
//! in `freshet_store`:
//!
//! - [`InMemoryStore`] - a concurrent entry store backed by moka, configured through
//!   [`InMemoryStoreBuilder`] without exposing moka types.
//! - [`InMemoryVaryProvider`] - per-resource `Vary` header name records.
//! - [`InMemoryDependencyIndex`] - a sharded reverse index from URIs to cache keys.
//!
//! # Quick Start
//!
//! ```
//! use freshet_memory::InMemoryStoreBuilder;
//! use freshet_store::EntryStore;
//! use std::time::Duration;
//!
//! # futures::executor::block_on(async {
//! let store = InMemoryStoreBuilder::<String, i32>::new()
//!     .max_capacity(1000)
//!     .time_to_idle(Duration::from_secs(300))
//!     .build();
//!
//! store.insert(&"key".to_string(), 42).await?;
//! assert_eq!(store.get(&"key".to_string()).await?, Some(42));
//! # Ok::<(), freshet_store::Error>(())
//! # });
//! ```

pub mod builder;
mod dependency;
pub mod store;
mod vary;

#[doc(inline)]
pub use builder::InMemoryStoreBuilder;
#[doc(inline)]
pub use dependency::InMemoryDependencyIndex;
#[doc(inline)]
pub use store::InMemoryStore;
#[doc(inline)]
pub use vary::InMemoryVaryProvider;
