// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Outcomes of the two cache entry points.

use http::HeaderMap;

use crate::entry::CacheEntry;
use crate::key::CacheKey;

/// What the caller should do before performing an exchange.
#[derive(Debug, Clone)]
pub enum PrepareDecision {
    /// Serve the stored response; do not contact the origin.
    ServeFromCache(CacheEntry),
    /// Send the request with `headers` added, then pass the response to
    /// [`HttpCache::complete`](crate::HttpCache::complete).
    ProceedConditional {
        /// The stale entry a `304 Not Modified` would confirm.
        entry: CacheEntry,
        /// `If-None-Match` and/or `If-Modified-Since`.
        headers: HeaderMap,
    },
    /// Send the request unchanged.
    ProceedPlain,
}

impl PrepareDecision {
    /// Returns the entry to serve, if the decision is [`PrepareDecision::ServeFromCache`].
    #[must_use]
    pub fn cached(&self) -> Option<&CacheEntry> {
        match self {
            Self::ServeFromCache(entry) => Some(entry),
            _ => None,
        }
    }

    /// Returns `true` for [`PrepareDecision::ProceedPlain`].
    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self, Self::ProceedPlain)
    }
}

/// What the cache did with a completed exchange.
#[derive(Debug, Clone)]
pub enum CompleteOutcome {
    /// The response was stored under the key.
    Stored(CacheKey),
    /// A `304 Not Modified` refreshed the stored entry; the refreshed entry is returned.
    Refreshed(CacheEntry),
    /// A successful mutation removed this many entries.
    Invalidated(usize),
    /// Nothing was written.
    Skipped(SkipReason),
}

/// Why [`CompleteOutcome::Skipped`] was returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SkipReason {
    /// An unsafe request did not succeed, so nothing was invalidated.
    UnsuccessfulMutation,
    /// The request method is safe but not cacheable under the policy.
    MethodNotCacheable,
    /// The request carried `Cache-Control: no-store`.
    RequestNotCacheable,
    /// The response carried `Cache-Control: no-store`.
    NoStore,
    /// The response status is not cacheable.
    StatusNotCacheable,
    /// The response carried `Vary: *`.
    VaryAny,
    /// The response validator rejected the response.
    RejectedByValidator,
    /// The revalidation validator rejected a `304 Not Modified`.
    RevalidationRejected,
    /// A `304 Not Modified` arrived but no entry was stored.
    NoEntryToRefresh,
    /// A provider failed while writing.
    ProviderFailure,
}

impl SkipReason {
    /// A short, stable name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsuccessfulMutation => "unsuccessful_mutation",
            Self::MethodNotCacheable => "method_not_cacheable",
            Self::RequestNotCacheable => "request_not_cacheable",
            Self::NoStore => "no_store",
            Self::StatusNotCacheable => "status_not_cacheable",
            Self::VaryAny => "vary_any",
            Self::RejectedByValidator => "rejected_by_validator",
            Self::RevalidationRejected => "revalidation_rejected",
            Self::NoEntryToRefresh => "no_entry_to_refresh",
            Self::ProviderFailure => "provider_failure",
        }
    }
}
