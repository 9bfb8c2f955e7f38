// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resource identities and cache keys.
//!
//! A [`ResourceId`] names a resource independently of request headers: the uppercase
//! method plus the canonical URI. A [`CacheKey`] extends it with the values of the request
//! headers the resource's responses varied on.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter, Write as _};

use http::uri::{Authority, PathAndQuery, Scheme};
use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};

/// Returns the canonical string form of a URI.
///
/// The scheme and host are lowercased, a default port (80 for `http`, 443 for `https`)
/// is dropped, an empty path becomes `/`, and the query is kept verbatim. User info is
/// dropped. URIs without a scheme render as their path and query only.
///
/// # Examples
///
/// ```
/// use freshet::canonical_uri;
/// use http::Uri;
///
/// let uri: Uri = "https://Example.COM:443/?b=2&a=1".parse().unwrap();
/// assert_eq!(canonical_uri(&uri), "https://example.com/?b=2&a=1");
/// ```
#[must_use]
pub fn canonical_uri(uri: &Uri) -> String {
    let mut out = String::new();

    if let (Some(scheme), Some(authority)) = (uri.scheme(), uri.authority()) {
        let scheme = scheme.as_str().to_ascii_lowercase();
        out.push_str(&scheme);
        out.push_str("://");
        out.push_str(&authority.host().to_ascii_lowercase());
        if let Some(port) = authority.port_u16()
            && Some(port) != default_port(&scheme)
        {
            let _ = write!(out, ":{port}");
        }
    }

    let path = uri.path();
    if path.is_empty() {
        out.push('/');
    } else {
        out.push_str(path);
    }

    if let Some(query) = uri.query() {
        out.push('?');
        out.push_str(query);
    }

    out
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Resolves `reference` against `base`.
///
/// Absolute references are returned as-is; absolute-path references (`/a/b`) take the
/// scheme and authority of `base`; other relative references are merged with the
/// directory of `base`'s path. Returns `None` when the reference does not parse.
pub(crate) fn resolve(base: &Uri, reference: &str) -> Option<Uri> {
    if reference.contains("://") {
        return reference.parse().ok();
    }

    let path_and_query = if reference.starts_with('/') {
        reference.to_owned()
    } else {
        let base_path = base.path();
        let directory = base_path.rfind('/').map_or("/", |idx| &base_path[..=idx]);
        format!("{directory}{reference}")
    };
    let path_and_query: PathAndQuery = path_and_query.parse().ok()?;

    let (Some(scheme), Some(authority)) = (base.scheme(), base.authority()) else {
        return Some(Uri::from(path_and_query));
    };

    Uri::builder()
        .scheme(Scheme::clone(scheme))
        .authority(Authority::clone(authority))
        .path_and_query(path_and_query)
        .build()
        .ok()
}

/// Returns `true` when both URIs have the same scheme, host, and effective port.
pub(crate) fn same_origin(a: &Uri, b: &Uri) -> bool {
    fn origin(uri: &Uri) -> Option<(String, String, Option<u16>)> {
        let scheme = uri.scheme_str()?.to_ascii_lowercase();
        let authority = uri.authority()?;
        let port = authority.port_u16().or_else(|| default_port(&scheme));
        Some((scheme, authority.host().to_ascii_lowercase(), port))
    }

    matches!((origin(a), origin(b)), (Some(a), Some(b)) if a == b)
}

/// The canonical identity of a resource: uppercase method plus canonical URI.
///
/// This is the key under which `Vary` header names are recorded.
///
/// # Examples
///
/// ```
/// use freshet::ResourceId;
/// use http::{Method, Uri};
///
/// let uri: Uri = "https://Example.com/foo?x=1#frag".parse().unwrap();
/// let id = ResourceId::new(&Method::GET, &uri);
/// assert_eq!(id.as_str(), "GET https://example.com/foo?x=1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    rendered: String,
    uri_offset: usize,
}

impl ResourceId {
    /// Creates the identity of `method` applied to `uri`.
    #[must_use]
    pub fn new(method: &Method, uri: &Uri) -> Self {
        let method = method.as_str().to_ascii_uppercase();
        let uri_offset = method.len() + 1;
        let rendered = format!("{method} {}", canonical_uri(uri));
        Self { rendered, uri_offset }
    }

    /// Returns the rendered identity, e.g. `"GET https://example.com/foo?x=1"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Returns the uppercase method part.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.rendered[..self.uri_offset - 1]
    }

    /// Returns the canonical URI part.
    #[must_use]
    pub fn canonical_uri(&self) -> &str {
        &self.rendered[self.uri_offset..]
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// A deterministic cache key.
///
/// The key is the [`ResourceId`] followed by one `|name=value` segment per header name
/// in the resource's recorded `Vary` set, in sorted order. Multiple values of one header
/// are joined with `", "`, and an absent header contributes an empty value. `%` and `|`
/// in header values are percent-escaped so segments cannot run together.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
///
/// use freshet::{CacheKey, ResourceId};
/// use http::{HeaderMap, Method, Uri};
///
/// let uri: Uri = "https://example.com/foo".parse().unwrap();
/// let resource = ResourceId::new(&Method::GET, &uri);
///
/// let mut headers = HeaderMap::new();
/// headers.insert("accept-language", "en".parse().unwrap());
/// let vary: BTreeSet<String> = ["accept-language".to_string()].into();
///
/// let key = CacheKey::compute(&resource, &vary, &headers);
/// assert_eq!(key.as_str(), "GET https://example.com/foo|accept-language=en");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Computes the key for a request to `resource` carrying `headers`.
    ///
    /// `vary` holds lowercase header names; only those headers participate in the key.
    #[must_use]
    pub fn compute(resource: &ResourceId, vary: &BTreeSet<String>, headers: &HeaderMap) -> Self {
        let mut key = resource.as_str().to_owned();

        for name in vary {
            let value = headers
                .get_all(name.as_str())
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");

            key.push('|');
            key.push_str(name);
            key.push('=');
            push_escaped(&mut key, &value);
        }

        Self(key)
    }

    /// Returns the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_escaped(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '|' => out.push_str("%7C"),
            c => out.push(c),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn canonical_uri_normalizes_scheme_host_and_port() {
        assert_eq!(canonical_uri(&uri("http://Example.COM:80/A/b")), "http://example.com/A/b");
        assert_eq!(canonical_uri(&uri("https://example.com:8443/x")), "https://example.com:8443/x");
        assert_eq!(canonical_uri(&uri("https://example.com")), "https://example.com/");
    }

    #[test]
    fn canonical_uri_keeps_query_verbatim() {
        assert_eq!(canonical_uri(&uri("https://a.com/p?b=2&a=%41")), "https://a.com/p?b=2&a=%41");
    }

    #[test]
    fn canonical_uri_of_relative_reference_is_path_and_query() {
        assert_eq!(canonical_uri(&uri("/foo?x=1")), "/foo?x=1");
    }

    #[test]
    fn resource_id_parts() {
        let id = ResourceId::new(&Method::PUT, &uri("https://a.com/x"));
        assert_eq!(id.method(), "PUT");
        assert_eq!(id.canonical_uri(), "https://a.com/x");
        assert_eq!(id.to_string(), "PUT https://a.com/x");
    }

    #[test]
    fn key_ignores_headers_outside_vary_set() {
        let id = ResourceId::new(&Method::GET, &uri("https://a.com/x"));
        let mut first = HeaderMap::new();
        first.insert("accept", "text/html".parse().unwrap());
        let mut second = HeaderMap::new();
        second.insert("accept", "application/json".parse().unwrap());

        let vary = names(&["accept-language"]);
        assert_eq!(CacheKey::compute(&id, &vary, &first), CacheKey::compute(&id, &vary, &second));
    }

    #[test]
    fn key_distinguishes_absent_from_present() {
        let id = ResourceId::new(&Method::GET, &uri("https://a.com/x"));
        let vary = names(&["accept-language"]);
        let mut headers = HeaderMap::new();
        headers.insert("accept-language", "en".parse().unwrap());

        let absent = CacheKey::compute(&id, &vary, &HeaderMap::new());
        let present = CacheKey::compute(&id, &vary, &headers);
        assert_ne!(absent, present);
        assert_eq!(absent.as_str(), "GET https://a.com/x|accept-language=");
    }

    #[test]
    fn key_joins_multiple_values_and_sorts_names() {
        let id = ResourceId::new(&Method::GET, &uri("https://a.com/x"));
        let vary = names(&["x-b", "accept"]);
        let mut headers = HeaderMap::new();
        headers.append("accept", "a".parse().unwrap());
        headers.append("accept", "b".parse().unwrap());
        headers.insert("x-b", "1|2%".parse().unwrap());

        let key = CacheKey::compute(&id, &vary, &headers);
        assert_eq!(key.as_str(), "GET https://a.com/x|accept=a, b|x-b=1%7C2%25");
    }

    #[test]
    fn resolve_handles_absolute_and_relative_references() {
        let base = uri("https://a.com/items/7");
        assert_eq!(resolve(&base, "https://b.com/z").unwrap(), uri("https://b.com/z"));
        assert_eq!(resolve(&base, "/items/8").unwrap(), uri("https://a.com/items/8"));
        assert_eq!(resolve(&base, "9?full=1").unwrap(), uri("https://a.com/items/9?full=1"));
    }

    #[test]
    fn same_origin_uses_effective_port() {
        assert!(same_origin(&uri("https://A.com/x"), &uri("https://a.com:443/y")));
        assert!(!same_origin(&uri("https://a.com/x"), &uri("http://a.com/x")));
        assert!(!same_origin(&uri("https://a.com/x"), &uri("/x")));
    }
}
