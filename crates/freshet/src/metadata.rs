// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-only projection of the response fields that drive caching decisions.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use http::header::{AGE, DATE, ETAG, EXPIRES, LAST_MODIFIED, VARY};
use http::{HeaderMap, StatusCode};

use crate::directives::CacheControl;

/// Lifetimes are capped so the expiration instant stays representable.
const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The request header names a response varies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarySpec {
    /// The listed names, lowercased and de-duplicated. Empty when the response has no `Vary`.
    Names(BTreeSet<String>),
    /// `Vary: *`; the response can never be matched from cache.
    Any,
}

impl VarySpec {
    /// Parses every `Vary` field line of `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut names = BTreeSet::new();

        for value in headers.get_all(VARY) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
                if name == "*" {
                    return Self::Any;
                }
                names.insert(name.to_ascii_lowercase());
            }
        }

        Self::Names(names)
    }
}

/// What the freshness and storage logic needs to know about a response.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    status: StatusCode,
    etag: Option<String>,
    last_modified: Option<SystemTime>,
    date: Option<SystemTime>,
    age: Option<Duration>,
    expires: Option<SystemTime>,
    cache_control: CacheControl,
    vary: VarySpec,
    dependent_uris: Vec<String>,
}

impl ResponseMetadata {
    /// Extracts metadata from a response's status and headers.
    ///
    /// Unparsable dates are treated as absent, except `Expires`, where an invalid value
    /// means "already expired".
    #[must_use]
    pub fn new(status: StatusCode, headers: &HeaderMap) -> Self {
        let expires = headers
            .get(EXPIRES)
            .map(|value| value.to_str().ok().and_then(|v| httpdate::parse_http_date(v).ok()).unwrap_or(SystemTime::UNIX_EPOCH));

        Self {
            status,
            etag: header_str(headers, &ETAG).map(str::to_owned),
            last_modified: header_date(headers, &LAST_MODIFIED),
            date: header_date(headers, &DATE),
            age: header_str(headers, &AGE)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs),
            expires,
            cache_control: CacheControl::from_headers(headers),
            vary: VarySpec::from_headers(headers),
            dependent_uris: Vec::new(),
        }
    }

    /// Attaches the dependent URIs the response declared.
    #[must_use]
    pub fn with_dependent_uris(mut self, uris: impl IntoIterator<Item = String>) -> Self {
        self.dependent_uris.extend(uris);
        self
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The `ETag` value, verbatim.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// The parsed `Last-Modified` date.
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// The parsed `Date`.
    #[must_use]
    pub fn date(&self) -> Option<SystemTime> {
        self.date
    }

    /// The parsed `Expires`; invalid values map to the epoch.
    #[must_use]
    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    /// The combined `Cache-Control` directives.
    #[must_use]
    pub fn cache_control(&self) -> &CacheControl {
        &self.cache_control
    }

    /// The `Vary` declaration.
    #[must_use]
    pub fn vary(&self) -> &VarySpec {
        &self.vary
    }

    /// URIs the response declared as dependencies.
    #[must_use]
    pub fn dependent_uris(&self) -> &[String] {
        &self.dependent_uris
    }

    /// Returns the freshness lifetime the response states explicitly.
    ///
    /// `max-age` wins over `Expires`; `Expires` is measured from `Date`, or from `now`
    /// when the response has no `Date`.
    #[must_use]
    pub fn explicit_lifetime(&self, now: SystemTime) -> Option<Duration> {
        if let Some(max_age) = self.cache_control.max_age() {
            return Some(max_age);
        }

        self.expires
            .map(|expires| expires.duration_since(self.date.unwrap_or(now)).unwrap_or_default())
    }

    /// Computes the absolute expiration of a response received at `now`.
    ///
    /// The lifetime is the explicit one, else `default_ttl`. The response's current age
    /// (the larger of `Age` and how far `Date` lies in the past) is subtracted, so a
    /// response that was already old on arrival expires sooner.
    #[must_use]
    pub fn expiration(&self, now: SystemTime, default_ttl: Duration) -> SystemTime {
        let lifetime = self.explicit_lifetime(now).unwrap_or(default_ttl);
        let apparent_age = self
            .date
            .and_then(|date| now.duration_since(date).ok())
            .unwrap_or_default();
        let age = apparent_age.max(self.age.unwrap_or_default());

        let remaining = lifetime.saturating_sub(age).min(MAX_LIFETIME);
        now.checked_add(remaining).unwrap_or(now)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &http::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::trim)
}

fn header_date(headers: &HeaderMap, name: &http::HeaderName) -> Option<SystemTime> {
    header_str(headers, name).and_then(|value| httpdate::parse_http_date(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_SECS: u64 = 1_700_000_000;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(NOW_SECS)
    }

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    fn metadata(pairs: &[(&str, &str)]) -> ResponseMetadata {
        ResponseMetadata::new(StatusCode::OK, &headers(pairs))
    }

    #[test]
    fn vary_names_are_normalized() {
        let spec = VarySpec::from_headers(&headers(&[("vary", "Accept-Language, accept"), ("vary", "ACCEPT")]));
        let expected: BTreeSet<String> = ["accept".to_owned(), "accept-language".to_owned()].into();
        assert_eq!(spec, VarySpec::Names(expected));
    }

    #[test]
    fn vary_star_is_any() {
        assert_eq!(VarySpec::from_headers(&headers(&[("vary", "accept, *")])), VarySpec::Any);
    }

    #[test]
    fn extracts_validators_and_dates() {
        let date = httpdate::fmt_http_date(now());
        let meta = metadata(&[("etag", "\"v1\""), ("last-modified", &date), ("date", &date)]);

        assert_eq!(meta.etag(), Some("\"v1\""));
        assert_eq!(meta.last_modified(), Some(now()));
        assert_eq!(meta.date(), Some(now()));
    }

    #[test]
    fn max_age_is_relative_to_date() {
        let date = httpdate::fmt_http_date(now());
        let meta = metadata(&[("cache-control", "max-age=60"), ("date", &date)]);

        assert_eq!(meta.expiration(now(), Duration::ZERO), now() + Duration::from_secs(60));
        // Received 10 seconds after it was generated.
        let later = now() + Duration::from_secs(10);
        assert_eq!(meta.expiration(later, Duration::ZERO), now() + Duration::from_secs(60));
    }

    #[test]
    fn age_header_shortens_lifetime() {
        let meta = metadata(&[("cache-control", "max-age=60"), ("age", "20")]);
        assert_eq!(meta.expiration(now(), Duration::ZERO), now() + Duration::from_secs(40));
    }

    #[test]
    fn expires_is_used_without_max_age() {
        let date = httpdate::fmt_http_date(now());
        let expires = httpdate::fmt_http_date(now() + Duration::from_secs(120));
        let meta = metadata(&[("date", &date), ("expires", &expires)]);

        assert_eq!(meta.explicit_lifetime(now()), Some(Duration::from_secs(120)));
        assert_eq!(meta.expiration(now(), Duration::ZERO), now() + Duration::from_secs(120));
    }

    #[test]
    fn max_age_beats_expires() {
        let expires = httpdate::fmt_http_date(now() + Duration::from_secs(120));
        let meta = metadata(&[("cache-control", "max-age=5"), ("expires", &expires)]);
        assert_eq!(meta.explicit_lifetime(now()), Some(Duration::from_secs(5)));
    }

    #[test]
    fn invalid_expires_means_expired() {
        let meta = metadata(&[("expires", "0")]);
        assert_eq!(meta.expiration(now(), Duration::from_secs(300)), now());
    }

    #[test]
    fn default_ttl_applies_without_explicit_lifetime() {
        let meta = metadata(&[]);
        assert_eq!(meta.explicit_lifetime(now()), None);
        assert_eq!(meta.expiration(now(), Duration::from_secs(300)), now() + Duration::from_secs(300));
    }

    #[test]
    fn dependent_uris_are_attached() {
        let meta = metadata(&[]).with_dependent_uris(["https://a.com/x".to_owned()]);
        assert_eq!(meta.dependent_uris(), ["https://a.com/x".to_owned()]);
    }
}
