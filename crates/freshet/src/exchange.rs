// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The request and response halves of an exchange, as seen by the cache.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri};

/// An outbound request, described to the cache before and after the exchange.
///
/// Besides the method, URI, and headers, a request can declare dependent URIs: resources
/// whose cached representations become invalid when this request mutates something, or
/// whose mutation invalidates this request's cached response.
///
/// # Examples
///
/// ```
/// use freshet::CacheRequest;
/// use http::Method;
///
/// let request = CacheRequest::get("https://example.com/orders/7".parse().unwrap())
///     .with_header(http::header::ACCEPT, "application/json".parse().unwrap())
///     .depends_on("/orders");
///
/// assert_eq!(request.method(), &Method::GET);
/// assert_eq!(request.dependent_uris(), ["/orders"]);
/// ```
#[derive(Debug, Clone)]
pub struct CacheRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    depends_on: Vec<String>,
}

impl CacheRequest {
    /// Creates a request without headers.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Describes a request from its `http` parts.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            depends_on: Vec::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Declares a dependent URI, absolute or relative to the request URI.
    #[must_use]
    pub fn depends_on(mut self, uri: impl Into<String>) -> Self {
        self.depends_on.push(uri.into());
        self
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers, e.g. to merge conditional headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The declared dependent URIs, as given.
    #[must_use]
    pub fn dependent_uris(&self) -> &[String] {
        &self.depends_on
    }
}

/// A received response, handed to the cache after the exchange.
#[derive(Debug, Clone)]
pub struct CacheResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    depends_on: Vec<String>,
}

impl CacheResponse {
    /// Creates a response with an empty body and no headers.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            depends_on: Vec::new(),
        }
    }

    /// Describes a response from its `http` parts and collected body.
    #[must_use]
    pub fn from_parts(parts: &http::response::Parts, body: Bytes) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers.clone(),
            body,
            depends_on: Vec::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Declares a dependent URI, absolute or relative to the request URI.
    #[must_use]
    pub fn depends_on(mut self, uri: impl Into<String>) -> Self {
        self.depends_on.push(uri.into());
        self
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The declared dependent URIs, as given.
    #[must_use]
    pub fn dependent_uris(&self) -> &[String] {
        &self.depends_on
    }
}
