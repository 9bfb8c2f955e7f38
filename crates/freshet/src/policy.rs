// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Caching policy and its builder.

use std::sync::Arc;
use std::time::Duration;

use freshet_store::Error;
use http::{Method, StatusCode};

use crate::validators::{RequestValidator, ResponseValidator, RevalidationValidator, StalenessValidator, Validators};

/// Freshness lifetime for cacheable responses that state none.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A configuration value that remembers whether it was set explicitly.
///
/// # Examples
///
/// ```
/// use freshet::Setting;
///
/// let mut ttl = Setting::new(300_u64);
/// assert!(!ttl.is_explicit());
///
/// ttl.set(60);
/// assert!(ttl.is_explicit());
/// assert_eq!(*ttl.value(), 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting<T> {
    value: T,
    explicit: bool,
}

impl<T> Setting<T> {
    /// Creates a setting holding a default value.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self {
            value: default,
            explicit: false,
        }
    }

    /// Creates a setting holding an explicitly chosen value.
    #[must_use]
    pub fn explicit(value: T) -> Self {
        Self { value, explicit: true }
    }

    /// Overrides the value and marks the setting explicit.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.explicit = true;
    }

    /// The current value.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns `true` if the value was set explicitly rather than defaulted.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Consumes the setting and returns the value.
    #[must_use]
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Decides what is cacheable and for how long.
///
/// Build one with [`CachePolicy::builder`]; [`CachePolicy::default`] caches `GET` and
/// `HEAD`, treats statuses 200, 203, 204, 300, 301, and 308 as cacheable, gives
/// responses without explicit freshness [`DEFAULT_TTL`], does not force revalidation,
/// and never serves stale entries.
///
/// When `must_revalidate` is set it takes precedence over the staleness validator: an
/// expired entry is revalidated even if the validator would allow serving it.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    cacheable_methods: Setting<Vec<Method>>,
    cacheable_statuses: Setting<Vec<StatusCode>>,
    default_ttl: Setting<Duration>,
    must_revalidate: Setting<bool>,
    validators: Validators,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            cacheable_methods: Setting::new(vec![Method::GET, Method::HEAD]),
            cacheable_statuses: Setting::new(vec![
                StatusCode::OK,
                StatusCode::NON_AUTHORITATIVE_INFORMATION,
                StatusCode::NO_CONTENT,
                StatusCode::MULTIPLE_CHOICES,
                StatusCode::MOVED_PERMANENTLY,
                StatusCode::PERMANENT_REDIRECT,
            ]),
            default_ttl: Setting::new(DEFAULT_TTL),
            must_revalidate: Setting::new(false),
            validators: Validators::default(),
        }
    }
}

impl CachePolicy {
    /// Creates a builder starting from the default policy.
    #[must_use]
    pub fn builder() -> CachePolicyBuilder {
        CachePolicyBuilder::default()
    }

    /// Returns `true` if responses to `method` may be cached.
    #[must_use]
    pub fn is_cacheable_method(&self, method: &Method) -> bool {
        self.cacheable_methods.value().contains(method)
    }

    /// Returns `true` if responses with `status` may be stored.
    #[must_use]
    pub fn is_cacheable_status(&self, status: StatusCode) -> bool {
        self.cacheable_statuses.value().contains(&status)
    }

    /// The cacheable methods.
    #[must_use]
    pub fn cacheable_methods(&self) -> &Setting<Vec<Method>> {
        &self.cacheable_methods
    }

    /// The cacheable statuses.
    #[must_use]
    pub fn cacheable_statuses(&self) -> &Setting<Vec<StatusCode>> {
        &self.cacheable_statuses
    }

    /// The lifetime of responses without explicit freshness.
    #[must_use]
    pub fn default_ttl(&self) -> &Setting<Duration> {
        &self.default_ttl
    }

    /// Whether every use of a stored entry requires revalidation.
    #[must_use]
    pub fn must_revalidate(&self) -> &Setting<bool> {
        &self.must_revalidate
    }

    /// The decision strategies.
    #[must_use]
    pub fn validators(&self) -> &Validators {
        &self.validators
    }
}

/// Builder for [`CachePolicy`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use freshet::CachePolicy;
/// use http::Method;
///
/// let policy = CachePolicy::builder()
///     .cacheable_methods([Method::GET])
///     .default_ttl(Duration::from_secs(30))
///     .build()?;
///
/// assert!(!policy.is_cacheable_method(&Method::HEAD));
/// assert!(policy.default_ttl().is_explicit());
/// # Ok::<(), freshet::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CachePolicyBuilder {
    policy: CachePolicy,
}

impl CachePolicyBuilder {
    /// Sets the methods whose responses may be cached. Only safe methods are allowed.
    #[must_use]
    pub fn cacheable_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.policy.cacheable_methods.set(methods.into_iter().collect());
        self
    }

    /// Sets the statuses whose responses may be stored.
    #[must_use]
    pub fn cacheable_statuses(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        self.policy.cacheable_statuses.set(statuses.into_iter().collect());
        self
    }

    /// Sets the lifetime of responses without explicit freshness.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.policy.default_ttl.set(ttl);
        self
    }

    /// Forces revalidation on every use of a stored entry.
    #[must_use]
    pub fn must_revalidate(mut self, enabled: bool) -> Self {
        self.policy.must_revalidate.set(enabled);
        self
    }

    /// Replaces the request strategy.
    #[must_use]
    pub fn request_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.policy.validators.request.set(Arc::new(validator));
        self
    }

    /// Replaces the response strategy.
    #[must_use]
    pub fn response_validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.policy.validators.response.set(Arc::new(validator));
        self
    }

    /// Replaces the revalidation strategy.
    #[must_use]
    pub fn revalidation_validator(mut self, validator: impl RevalidationValidator + 'static) -> Self {
        self.policy.validators.revalidation.set(Arc::new(validator));
        self
    }

    /// Replaces the staleness strategy.
    #[must_use]
    pub fn staleness_validator(mut self, validator: impl StalenessValidator + 'static) -> Self {
        self.policy.validators.staleness.set(Arc::new(validator));
        self
    }

    /// Validates and builds the policy.
    ///
    /// Combining `must_revalidate` with an explicit staleness validator is allowed but
    /// logged, since the staleness validator will never apply.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidConfig`](freshet_store::ErrorKind::InvalidConfig)
    /// error if a cacheable method is not safe.
    pub fn build(self) -> Result<CachePolicy, Error> {
        if let Some(method) = self.policy.cacheable_methods.value().iter().find(|method| !method.is_safe()) {
            return Err(Error::invalid_config(format!("method {method} is not safe and cannot be cacheable")));
        }

        if *self.policy.must_revalidate.value() && self.policy.validators.staleness.is_explicit() {
            tracing::warn!(
                "must_revalidate is set together with a staleness validator; stale entries will be revalidated"
            );
        }

        Ok(self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::GraceWindow;

    #[test]
    fn default_policy_caches_get_and_head() {
        let policy = CachePolicy::default();
        assert!(policy.is_cacheable_method(&Method::GET));
        assert!(policy.is_cacheable_method(&Method::HEAD));
        assert!(!policy.is_cacheable_method(&Method::POST));
        assert!(policy.is_cacheable_status(StatusCode::OK));
        assert!(!policy.is_cacheable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(*policy.default_ttl().value(), DEFAULT_TTL);
        assert!(!policy.default_ttl().is_explicit());
    }

    #[test]
    fn unsafe_cacheable_method_is_rejected() {
        let error = CachePolicy::builder()
            .cacheable_methods([Method::GET, Method::POST])
            .build()
            .unwrap_err();
        assert_eq!(error.kind(), freshet_store::ErrorKind::InvalidConfig);
    }

    #[test]
    fn safe_extension_methods_are_accepted() {
        let policy = CachePolicy::builder()
            .cacheable_methods([Method::GET, Method::OPTIONS])
            .build()
            .unwrap();
        assert!(policy.cacheable_methods().is_explicit());
        assert!(policy.is_cacheable_method(&Method::OPTIONS));
    }

    #[test]
    fn must_revalidate_with_staleness_builds() {
        let policy = CachePolicy::builder()
            .must_revalidate(true)
            .staleness_validator(GraceWindow::new(Duration::from_secs(10)))
            .build()
            .unwrap();
        assert!(*policy.must_revalidate().value());
        assert!(policy.validators().staleness_setting().is_explicit());
    }

    #[test]
    fn setting_into_value() {
        assert_eq!(Setting::explicit(5).into_value(), 5);
        assert!(Setting::explicit(5).is_explicit());
    }
}
