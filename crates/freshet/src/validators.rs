// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pluggable decision strategies.
//!
//! A [`CachePolicy`](crate::CachePolicy) composes four strategies, each with a default:
//!
//! | Strategy | Question | Default |
//! |----------|----------|---------|
//! | [`RequestValidator`] | May this request be answered from the cache? | [`DefaultRequestValidator`] |
//! | [`ResponseValidator`] | May this response be stored? | [`AcceptAll`] |
//! | [`RevalidationValidator`] | Does this 304 confirm the stored entry? | [`WeakEtagMatch`] |
//! | [`StalenessValidator`] | May this stale entry be served as-is? | [`NeverStale`] |

use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use http::header::{CACHE_CONTROL, ETAG};

use crate::directives::CacheControl;
use crate::entry::CacheEntry;
use crate::exchange::{CacheRequest, CacheResponse};
use crate::policy::Setting;

/// Decides whether a request may be served from the cache.
///
/// Storing the response is governed by the [`ResponseValidator`]; only a request
/// `Cache-Control: no-store` prevents it.
pub trait RequestValidator: Debug + Send + Sync {
    /// Returns `true` if a stored response may answer the request.
    fn is_cacheable(&self, request: &CacheRequest) -> bool;
}

/// Decides whether a response may be stored.
///
/// Runs after the status, `no-store`, and `Vary: *` checks; it is not consulted for
/// `304 Not Modified` refreshes.
pub trait ResponseValidator: Debug + Send + Sync {
    /// Returns `true` if the response may be stored.
    fn is_storable(&self, request: &CacheRequest, response: &CacheResponse) -> bool;
}

/// Decides whether a `304 Not Modified` response revalidates a stored entry.
pub trait RevalidationValidator: Debug + Send + Sync {
    /// Returns `true` if `response` confirms `entry`.
    fn accepts(&self, entry: &CacheEntry, response: &CacheResponse) -> bool;
}

/// Decides whether a stale entry may still be served without revalidation.
pub trait StalenessValidator: Debug + Send + Sync {
    /// Returns `true` if `entry`, stale at `now`, may be served.
    fn allow_stale(&self, entry: &CacheEntry, now: SystemTime) -> bool;
}

/// Rejects requests that carry `Cache-Control: no-store` or `no-cache`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRequestValidator;

impl RequestValidator for DefaultRequestValidator {
    fn is_cacheable(&self, request: &CacheRequest) -> bool {
        if !request.headers().contains_key(CACHE_CONTROL) {
            return true;
        }
        let cc = CacheControl::from_headers(request.headers());
        !cc.no_store() && !cc.no_cache()
    }
}

/// Accepts every response.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ResponseValidator for AcceptAll {
    fn is_storable(&self, _request: &CacheRequest, _response: &CacheResponse) -> bool {
        true
    }
}

impl RequestValidator for AcceptAll {
    fn is_cacheable(&self, _request: &CacheRequest) -> bool {
        true
    }
}

/// Accepts a 304 unless both it and the entry carry `ETag`s that do not match weakly.
///
/// Weak comparison ignores the `W/` prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeakEtagMatch;

impl RevalidationValidator for WeakEtagMatch {
    fn accepts(&self, entry: &CacheEntry, response: &CacheResponse) -> bool {
        let new = response.headers().get(ETAG).and_then(|value| value.to_str().ok());
        match (entry.etag(), new) {
            (Some(stored), Some(new)) => weak_eq(stored, new),
            _ => true,
        }
    }
}

/// Compares two entity tags using the weak comparison function.
#[must_use]
pub fn weak_eq(a: &str, b: &str) -> bool {
    fn opaque(tag: &str) -> &str {
        let tag = tag.trim();
        tag.strip_prefix("W/").unwrap_or(tag)
    }
    opaque(a) == opaque(b)
}

/// Never serves stale entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStale;

impl StalenessValidator for NeverStale {
    fn allow_stale(&self, _entry: &CacheEntry, _now: SystemTime) -> bool {
        false
    }
}

/// Serves stale entries for a bounded time past their expiration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use freshet::{CachePolicy, GraceWindow};
///
/// let policy = CachePolicy::builder()
///     .staleness_validator(GraceWindow::new(Duration::from_secs(30)))
///     .build()
///     .unwrap();
/// assert!(policy.validators().staleness_setting().is_explicit());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GraceWindow {
    window: Duration,
}

impl GraceWindow {
    /// Creates a grace window of `window` past expiration.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// The length of the window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl StalenessValidator for GraceWindow {
    fn allow_stale(&self, entry: &CacheEntry, now: SystemTime) -> bool {
        entry
            .expires_at()
            .checked_add(self.window)
            .is_none_or(|deadline| now < deadline)
    }
}

/// The strategies a policy applies.
///
/// Each strategy is a [`Setting`], so callers can tell a configured strategy from the
/// default one.
#[derive(Debug, Clone)]
pub struct Validators {
    pub(crate) request: Setting<Arc<dyn RequestValidator>>,
    pub(crate) response: Setting<Arc<dyn ResponseValidator>>,
    pub(crate) revalidation: Setting<Arc<dyn RevalidationValidator>>,
    pub(crate) staleness: Setting<Arc<dyn StalenessValidator>>,
}

impl Default for Validators {
    fn default() -> Self {
        Self {
            request: Setting::new(Arc::new(DefaultRequestValidator)),
            response: Setting::new(Arc::new(AcceptAll)),
            revalidation: Setting::new(Arc::new(WeakEtagMatch)),
            staleness: Setting::new(Arc::new(NeverStale)),
        }
    }
}

impl Validators {
    /// The request strategy.
    #[must_use]
    pub fn request(&self) -> &dyn RequestValidator {
        &**self.request.value()
    }

    /// The response strategy.
    #[must_use]
    pub fn response(&self) -> &dyn ResponseValidator {
        &**self.response.value()
    }

    /// The revalidation strategy.
    #[must_use]
    pub fn revalidation(&self) -> &dyn RevalidationValidator {
        &**self.revalidation.value()
    }

    /// The staleness strategy.
    #[must_use]
    pub fn staleness(&self) -> &dyn StalenessValidator {
        &**self.staleness.value()
    }

    /// The staleness strategy together with whether it was configured explicitly.
    #[must_use]
    pub fn staleness_setting(&self) -> &Setting<Arc<dyn StalenessValidator>> {
        &self.staleness
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};

    use super::*;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn entry(etag: Option<&str>) -> CacheEntry {
        let mut headers = HeaderMap::new();
        headers.insert("cache-control", "max-age=10".parse().unwrap());
        if let Some(etag) = etag {
            headers.insert(ETAG, etag.parse().unwrap());
        }
        CacheEntry::from_response(
            StatusCode::OK,
            &headers,
            Bytes::new(),
            now(),
            Duration::ZERO,
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    fn not_modified(etag: Option<&str>) -> CacheResponse {
        let mut response = CacheResponse::new(StatusCode::NOT_MODIFIED);
        if let Some(etag) = etag {
            response = response.with_header(ETAG, etag.parse().unwrap());
        }
        response
    }

    #[test]
    fn weak_comparison_ignores_weakness() {
        assert!(weak_eq("W/\"a\"", "\"a\""));
        assert!(weak_eq("\"a\"", "\"a\""));
        assert!(!weak_eq("\"a\"", "\"b\""));
    }

    #[test]
    fn etag_match_rejects_only_conflicting_tags() {
        let validator = WeakEtagMatch;
        assert!(validator.accepts(&entry(Some("\"v1\"")), &not_modified(Some("W/\"v1\""))));
        assert!(!validator.accepts(&entry(Some("\"v1\"")), &not_modified(Some("\"v2\""))));
        assert!(validator.accepts(&entry(Some("\"v1\"")), &not_modified(None)));
        assert!(validator.accepts(&entry(None), &not_modified(Some("\"v2\""))));
    }

    #[test]
    fn default_request_validator_honors_request_directives() {
        let validator = DefaultRequestValidator;
        let uri: http::Uri = "https://a.com/".parse().unwrap();

        assert!(validator.is_cacheable(&CacheRequest::new(Method::GET, uri.clone())));
        let no_store = CacheRequest::new(Method::GET, uri.clone()).with_header(CACHE_CONTROL, "no-store".parse().unwrap());
        assert!(!validator.is_cacheable(&no_store));
        let max_age = CacheRequest::new(Method::GET, uri).with_header(CACHE_CONTROL, "max-age=0".parse().unwrap());
        assert!(validator.is_cacheable(&max_age));
    }

    #[test]
    fn grace_window_bounds_staleness() {
        let grace = GraceWindow::new(Duration::from_secs(5));
        let e = entry(None);

        assert!(grace.allow_stale(&e, now() + Duration::from_secs(12)));
        assert!(!grace.allow_stale(&e, now() + Duration::from_secs(15)));
        assert!(!NeverStale.allow_stale(&e, now() + Duration::from_secs(11)));
    }
}
