// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The stored representation of a cached response.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use freshet_store::StoreType;
use http::header::{
    AGE, CONNECTION, CONTENT_LENGTH, DATE, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use http::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::metadata::ResponseMetadata;

const HOP_BY_HOP: [HeaderName; 7] = [
    CONNECTION,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// A cached response.
///
/// Entries are created when a cacheable response is stored, refreshed in place when a
/// `304 Not Modified` revalidates them, and destroyed on invalidation or when a read
/// finds them corrupt. `no-store` responses never become entries.
///
/// Captured headers exclude hop-by-hop fields. When the origin sent no `Date`, the
/// time of receipt is recorded as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    status: u16,
    headers: Vec<(String, Vec<u8>)>,
    body: Bytes,
    etag: Option<String>,
    last_modified: Option<SystemTime>,
    date: Option<SystemTime>,
    stored_at: SystemTime,
    expires_at: SystemTime,
    no_cache: bool,
    must_revalidate: bool,
    vary: BTreeSet<String>,
    dependent_uris: BTreeSet<String>,
}

impl StoreType for CacheEntry {
    const TYPE_TAG: &'static str = "freshet.cache_entry.v1";
}

impl CacheEntry {
    /// Builds an entry from a response received at `now`.
    ///
    /// `vary` is the set of request header names the key was computed from and
    /// `dependent_uris` holds canonical URIs whose mutation invalidates the entry.
    #[must_use]
    pub fn from_response(
        status: StatusCode,
        headers: &HeaderMap,
        body: Bytes,
        now: SystemTime,
        default_ttl: Duration,
        vary: BTreeSet<String>,
        dependent_uris: BTreeSet<String>,
    ) -> Self {
        let mut captured = end_to_end(headers);
        if !captured.contains_key(DATE) {
            captured.insert(DATE, date_value(now));
        }

        let metadata = ResponseMetadata::new(status, &captured);
        let mut entry = Self {
            status: status.as_u16(),
            headers: Vec::new(),
            body,
            etag: None,
            last_modified: None,
            date: None,
            stored_at: now,
            expires_at: now,
            no_cache: false,
            must_revalidate: false,
            vary,
            dependent_uris,
        };
        entry.apply(&metadata, &captured, now, default_ttl);
        entry
    }

    /// Refreshes the entry from a `304 Not Modified` received at `now`.
    ///
    /// Header fields present in the 304 replace the stored ones; freshness information
    /// is then recomputed from the merged headers. The body is retained. A 304 without a
    /// `Date` is stamped with `now`.
    pub fn refresh(&mut self, not_modified: &HeaderMap, now: SystemTime, default_ttl: Duration) {
        let mut merged = self.headers();
        merged.remove(AGE);

        let update = end_to_end(not_modified);
        for name in update.keys() {
            if *name == CONTENT_LENGTH {
                continue;
            }
            merged.remove(name);
            for value in update.get_all(name) {
                merged.append(name.clone(), value.clone());
            }
        }
        if !update.contains_key(DATE) {
            merged.insert(DATE, date_value(now));
        }

        let metadata = ResponseMetadata::new(self.status(), &merged);
        self.stored_at = now;
        self.apply(&metadata, &merged, now, default_ttl);
    }

    fn apply(&mut self, metadata: &ResponseMetadata, headers: &HeaderMap, now: SystemTime, default_ttl: Duration) {
        self.headers = headers
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
            .collect();
        self.etag = metadata.etag().map(str::to_owned);
        self.last_modified = metadata.last_modified();
        self.date = metadata.date();
        self.expires_at = metadata.expiration(now, default_ttl);
        self.no_cache = metadata.cache_control().no_cache();
        self.must_revalidate = metadata.cache_control().must_revalidate();
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK)
    }

    /// The captured response headers.
    ///
    /// Pairs that no longer form a valid header are skipped.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value)) {
                map.append(name, value);
            }
        }
        map
    }

    /// The response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The `ETag` validator, verbatim.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// The `Last-Modified` validator.
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// The response `Date`.
    #[must_use]
    pub fn date(&self) -> Option<SystemTime> {
        self.date
    }

    /// When the entry was stored or last refreshed.
    #[must_use]
    pub fn stored_at(&self) -> SystemTime {
        self.stored_at
    }

    /// The instant after which the entry is stale.
    #[must_use]
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// Whether the response carried `no-cache`.
    #[must_use]
    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// Whether the response carried `must-revalidate`.
    #[must_use]
    pub fn must_revalidate(&self) -> bool {
        self.must_revalidate
    }

    /// The `Vary` header names active when the entry was stored.
    #[must_use]
    pub fn vary(&self) -> &BTreeSet<String> {
        &self.vary
    }

    /// Canonical URIs whose mutation invalidates this entry.
    #[must_use]
    pub fn dependent_uris(&self) -> &BTreeSet<String> {
        &self.dependent_uris
    }

    /// Returns `true` if the entry carries a validator usable for a conditional request.
    #[must_use]
    pub fn has_validator(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    /// Returns `true` if the entry is past its expiration at `now`.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// Headers that turn a request into a revalidation of this entry.
    ///
    /// Carries `If-None-Match` from the `ETag` and `If-Modified-Since` (as an IMF-fixdate)
    /// from `Last-Modified`, whichever are available.
    #[must_use]
    pub fn conditional_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.etag.as_deref().and_then(|etag| HeaderValue::from_str(etag).ok()) {
            headers.insert(IF_NONE_MATCH, value);
        }
        if let Some(last_modified) = self.last_modified {
            headers.insert(IF_MODIFIED_SINCE, date_value(last_modified));
        }
        headers
    }

    /// Rebuilds the cached response.
    #[must_use]
    pub fn to_response(&self) -> Response<Bytes> {
        let mut response = Response::new(self.body.clone());
        *response.status_mut() = self.status();
        *response.headers_mut() = self.headers();
        response
    }
}

/// Copies `headers` without hop-by-hop fields, including those listed in `Connection`.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive" || listed.iter().any(|l| l == name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn date_value(time: SystemTime) -> HeaderValue {
    HeaderValue::from_str(&httpdate::fmt_http_date(time)).unwrap_or_else(|_| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
}

#[cfg(test)]
mod tests {
    use freshet_store::Envelope;

    use super::*;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(HeaderName::from_bytes(name.as_bytes()).unwrap(), value.parse().unwrap());
        }
        map
    }

    fn entry(pairs: &[(&str, &str)]) -> CacheEntry {
        CacheEntry::from_response(
            StatusCode::OK,
            &headers(pairs),
            Bytes::from_static(b"hello"),
            now(),
            Duration::from_secs(300),
            BTreeSet::new(),
            BTreeSet::new(),
        )
    }

    #[test]
    fn from_response_captures_freshness_fields() {
        let e = entry(&[("cache-control", "max-age=60, no-cache, must-revalidate"), ("etag", "\"v1\"")]);

        assert_eq!(e.status(), StatusCode::OK);
        assert_eq!(e.etag(), Some("\"v1\""));
        assert_eq!(e.expires_at(), now() + Duration::from_secs(60));
        assert!(e.no_cache());
        assert!(e.must_revalidate());
        assert_eq!(e.date(), Some(now()));
        assert!(e.has_validator());
    }

    #[test]
    fn hop_by_hop_headers_are_dropped() {
        let e = entry(&[
            ("connection", "close, x-trace"),
            ("keep-alive", "timeout=5"),
            ("transfer-encoding", "chunked"),
            ("x-trace", "abc"),
            ("content-type", "text/plain"),
        ]);
        let stored = e.headers();

        assert!(stored.get("connection").is_none());
        assert!(stored.get("keep-alive").is_none());
        assert!(stored.get("transfer-encoding").is_none());
        assert!(stored.get("x-trace").is_none());
        assert_eq!(stored.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn conditional_headers_use_both_validators() {
        let last_modified = httpdate::fmt_http_date(now() - Duration::from_secs(3600));
        let e = entry(&[("etag", "W/\"v2\""), ("last-modified", &last_modified)]);
        let conditional = e.conditional_headers();

        assert_eq!(conditional.get(IF_NONE_MATCH).unwrap(), "W/\"v2\"");
        assert_eq!(conditional.get(IF_MODIFIED_SINCE).unwrap().to_str().unwrap(), last_modified);
    }

    #[test]
    fn refresh_replaces_freshness_and_keeps_body() {
        let mut e = entry(&[("cache-control", "max-age=60"), ("etag", "\"v1\""), ("x-kept", "yes")]);
        let later = now() + Duration::from_secs(90);

        e.refresh(&headers(&[("cache-control", "max-age=120"), ("etag", "\"v1\"")]), later, Duration::ZERO);

        assert_eq!(e.body(), &Bytes::from_static(b"hello"));
        assert_eq!(e.expires_at(), later + Duration::from_secs(120));
        assert_eq!(e.stored_at(), later);
        assert_eq!(e.date(), Some(later));
        assert_eq!(e.headers().get("x-kept").unwrap(), "yes");
    }

    #[test]
    fn refresh_without_cache_control_keeps_stored_lifetime() {
        let mut e = entry(&[("cache-control", "max-age=60"), ("etag", "\"v1\"")]);
        let later = now() + Duration::from_secs(90);

        e.refresh(&HeaderMap::new(), later, Duration::ZERO);

        assert_eq!(e.expires_at(), later + Duration::from_secs(60));
    }

    #[test]
    fn to_response_rebuilds_status_headers_and_body() {
        let e = entry(&[("content-type", "text/plain")]);
        let response = e.to_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
        assert_eq!(response.body(), &Bytes::from_static(b"hello"));
    }

    #[test]
    fn envelope_round_trip() {
        let e = entry(&[("etag", "\"v1\"")]);
        let envelope = Envelope::encode(&e).unwrap();
        assert_eq!(envelope.decode::<CacheEntry>().unwrap(), e);
    }
}
