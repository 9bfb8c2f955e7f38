// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `Cache-Control` parsing.

use std::time::Duration;

use http::HeaderMap;
use http::header::CACHE_CONTROL;

/// Parsed `Cache-Control` directives.
///
/// Directives from every `Cache-Control` field line are combined. Names are matched
/// case-insensitively, unknown directives are ignored, and an unparsable delta-seconds
/// value leaves the directive unset. `s-maxage` is parsed but never used by this cache,
/// which is private to its owner.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use freshet::CacheControl;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("cache-control", "public, max-age=60, must-revalidate".parse().unwrap());
///
/// let cc = CacheControl::from_headers(&headers);
/// assert_eq!(cc.max_age(), Some(Duration::from_secs(60)));
/// assert!(cc.must_revalidate());
/// assert!(!cc.no_store());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[expect(clippy::struct_excessive_bools, reason = "each flag is an independent directive")]
pub struct CacheControl {
    no_store: bool,
    no_cache: bool,
    must_revalidate: bool,
    private: bool,
    public: bool,
    max_age: Option<Duration>,
    s_maxage: Option<Duration>,
}

impl CacheControl {
    /// Parses the `Cache-Control` fields of `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cc = Self::default();

        for value in headers.get_all(CACHE_CONTROL) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for directive in split_directives(value) {
                cc.apply(directive);
            }
        }

        cc
    }

    fn apply(&mut self, directive: &str) {
        let (name, argument) = match directive.split_once('=') {
            Some((name, argument)) => (name.trim(), Some(argument.trim().trim_matches('"'))),
            None => (directive.trim(), None),
        };

        match name.to_ascii_lowercase().as_str() {
            "no-store" => self.no_store = true,
            // A qualified no-cache names fields; treating it as unqualified is conservative.
            "no-cache" => self.no_cache = true,
            "must-revalidate" => self.must_revalidate = true,
            "private" => self.private = true,
            "public" => self.public = true,
            "max-age" => self.max_age = argument.and_then(parse_delta_seconds),
            "s-maxage" => self.s_maxage = argument.and_then(parse_delta_seconds),
            _ => {}
        }
    }

    /// `no-store`: the response must not be stored.
    #[must_use]
    pub fn no_store(&self) -> bool {
        self.no_store
    }

    /// `no-cache`: a stored response must be revalidated before every use.
    #[must_use]
    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// `must-revalidate`: a stale stored response must not be served without revalidation.
    #[must_use]
    pub fn must_revalidate(&self) -> bool {
        self.must_revalidate
    }

    /// `private`, recorded for inspection.
    #[must_use]
    pub fn private(&self) -> bool {
        self.private
    }

    /// `public`, recorded for inspection.
    #[must_use]
    pub fn public(&self) -> bool {
        self.public
    }

    /// `max-age`, if present and valid.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// `s-maxage`, if present and valid.
    #[must_use]
    pub fn s_maxage(&self) -> Option<Duration> {
        self.s_maxage
    }
}

/// Splits a directive list on commas that are not inside a quoted string.
fn split_directives(value: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (idx, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);

    parts.into_iter().map(str::trim).filter(|part| !part.is_empty())
}

/// Parses delta-seconds, saturating values too large to represent.
fn parse_delta_seconds(value: &str) -> Option<Duration> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(Duration::from_secs(value.parse().unwrap_or(u64::MAX)))
}
