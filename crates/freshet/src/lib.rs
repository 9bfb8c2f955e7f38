// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! An HTTP response cache that follows HTTP caching semantics.
//!
//! The cache sits beside an HTTP client rather than inside it. Before sending a request,
//! ask [`HttpCache::prepare`]: it answers with a stored response that is still fresh,
//! with conditional headers for revalidating a stale one, or with a plain go-ahead. After
//! the exchange, hand the response to [`HttpCache::complete`], which stores it, refreshes
//! the stored entry on `304 Not Modified`, or invalidates dependent entries when a
//! mutation succeeds.
//!
//! The cache understands:
//!
//! - `Cache-Control` (`no-store`, `no-cache`, `max-age`, `must-revalidate`), `Expires`,
//!   `Date`, and `Age` when computing freshness;
//! - `ETag` and `Last-Modified` validators, turned into `If-None-Match` and
//!   `If-Modified-Since`;
//! - `Vary`, keeping one entry per combination of the varying request headers;
//! - dependent URIs, so a successful `PUT /orders/7` can invalidate a cached
//!   `GET /orders`.
//!
//! Storage is pluggable through the provider traits of `freshet_store`; the `memory`
//! feature (enabled by default) supplies in-memory providers via [`Providers::in_memory`].
//! What is cacheable and for how long is decided by a [`CachePolicy`] and its
//! [validator strategies](RequestValidator).
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use freshet::{CacheRequest, CacheResponse, HttpCache, PrepareDecision, Providers};
//! use http::StatusCode;
//! use http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
//! use tick::ClockControl;
//! # futures::executor::block_on(async {
//!
//! let control = ClockControl::new();
//! let cache = HttpCache::builder(control.to_clock(), Providers::in_memory()).build()?;
//! let request = CacheRequest::get("https://example.com/foo".parse().unwrap());
//!
//! let response = CacheResponse::new(StatusCode::OK)
//!     .with_header(CACHE_CONTROL, "max-age=60".parse().unwrap())
//!     .with_header(ETAG, "\"v1\"".parse().unwrap())
//!     .with_body("hello");
//! cache.complete(&request, &response).await?;
//!
//! // Fresh: served without contacting the origin.
//! assert!(matches!(cache.prepare(&request).await?, PrepareDecision::ServeFromCache(_)));
//!
//! // Stale: revalidate with the stored validator.
//! control.advance(Duration::from_secs(60));
//! let PrepareDecision::ProceedConditional { headers, .. } = cache.prepare(&request).await? else {
//!     panic!("expected a conditional request");
//! };
//! assert_eq!(headers[IF_NONE_MATCH], "\"v1\"");
//! # Ok::<(), freshet::Error>(())
//! # });
//! ```
//!
//! # Features
//!
//! - `memory` (default): in-memory providers and [`Providers::in_memory`].
//! - `metrics`: OpenTelemetry metrics through [`HttpCacheBuilder::metrics`].
//! - `dynamic-store`: re-exports the type-erased [`DynamicStore`].
//! - `test-util`: re-exports [`MockStore`] for failure injection.

mod builder;
mod cache;
mod decision;
mod dependency;
mod directives;
mod entry;
mod exchange;
mod freshness;
mod key;
mod metadata;
mod policy;
mod telemetry;
mod validators;
mod vary;

#[doc(inline)]
pub use builder::{HttpCacheBuilder, Providers};
#[doc(inline)]
pub use cache::HttpCache;
#[doc(inline)]
pub use decision::{CompleteOutcome, PrepareDecision, SkipReason};
#[doc(inline)]
pub use dependency::DependencyIndex;
#[doc(inline)]
pub use directives::CacheControl;
#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use exchange::{CacheRequest, CacheResponse};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use freshet_memory::{InMemoryDependencyIndex, InMemoryStore, InMemoryStoreBuilder, InMemoryVaryProvider};
#[cfg(feature = "dynamic-store")]
#[doc(inline)]
pub use freshet_store::DynamicStore;
#[doc(inline)]
pub use freshet_store::{DependencyProvider, EntryStore, Envelope, Error, ErrorKind, MismatchPolicy, Result, StoreType, VaryProvider};
#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use freshet_store::testing::{MockStore, StoreOp};
#[doc(inline)]
pub use freshness::{Freshness, classify};
#[doc(inline)]
pub use key::{CacheKey, ResourceId, canonical_uri};
#[doc(inline)]
pub use metadata::{ResponseMetadata, VarySpec};
#[doc(inline)]
pub use policy::{CachePolicy, CachePolicyBuilder, DEFAULT_TTL, Setting};
#[doc(inline)]
pub use telemetry::CacheName;
#[doc(inline)]
pub use validators::{
    AcceptAll, DefaultRequestValidator, GraceWindow, NeverStale, RequestValidator, ResponseValidator, RevalidationValidator,
    StalenessValidator, Validators, WeakEtagMatch, weak_eq,
};
#[doc(inline)]
pub use vary::VaryResolver;
