// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache orchestrator.

use std::collections::BTreeSet;

use freshet_store::{DependencyProvider, EntryStore, Envelope, Error, ErrorKind, MismatchPolicy, TypedStoreExt, VaryProvider};
use http::StatusCode;
use http::header::{CONTENT_LOCATION, LOCATION};
use tick::Clock;

use crate::builder::{HttpCacheBuilder, Providers};
use crate::decision::{CompleteOutcome, PrepareDecision, SkipReason};
use crate::directives::CacheControl;
use crate::entry::CacheEntry;
use crate::exchange::{CacheRequest, CacheResponse};
use crate::freshness::{Freshness, classify};
use crate::key::{CacheKey, ResourceId, canonical_uri, resolve, same_origin};
use crate::metadata::VarySpec;
use crate::policy::CachePolicy;
use crate::telemetry::{CacheActivity, CacheName, CacheOperation, CacheTelemetry, Timer};

/// An HTTP response cache.
///
/// The cache never performs requests itself. A caller asks [`prepare`](Self::prepare)
/// before an exchange, acts on the [`PrepareDecision`], and hands the response to
/// [`complete`](Self::complete) afterwards:
///
/// - a fresh entry is served without contacting the origin;
/// - a stale entry with validators turns the request into a conditional one, and the
///   origin's `304 Not Modified` refreshes the entry in place;
/// - a successful mutation (`POST`, `PUT`, `DELETE`, ...) invalidates every entry that
///   depends on the mutated URI.
///
/// Provider read failures are logged and treated as misses unless the cache was built
/// with [`strict`](HttpCacheBuilder::strict). Provider write failures never fail
/// [`complete`](Self::complete); they surface as [`SkipReason::ProviderFailure`].
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use freshet::{CacheRequest, CacheResponse, CompleteOutcome, HttpCache, PrepareDecision, Providers};
/// use http::StatusCode;
/// use http::header::CACHE_CONTROL;
/// use tick::Clock;
/// # futures::executor::block_on(async {
///
/// let cache = HttpCache::builder(Clock::new_frozen(), Providers::in_memory()).build()?;
/// let request = CacheRequest::get("https://example.com/foo".parse().unwrap());
///
/// assert!(matches!(cache.prepare(&request).await?, PrepareDecision::ProceedPlain));
///
/// let response = CacheResponse::new(StatusCode::OK)
///     .with_header(CACHE_CONTROL, "max-age=60".parse().unwrap())
///     .with_body("hello");
/// assert!(matches!(cache.complete(&request, &response).await?, CompleteOutcome::Stored(_)));
///
/// let decision = cache.prepare(&request).await?;
/// assert_eq!(decision.cached().unwrap().body(), "hello");
/// # Ok::<(), freshet::Error>(())
/// # });
/// ```
#[derive(Debug)]
pub struct HttpCache<S, V, D> {
    pub(crate) name: CacheName,
    pub(crate) clock: Clock,
    pub(crate) policy: CachePolicy,
    pub(crate) providers: Providers<S, V, D>,
    pub(crate) telemetry: CacheTelemetry,
    pub(crate) strict: bool,
    pub(crate) mismatch: MismatchPolicy,
}

impl<S, V, D> HttpCache<S, V, D>
where
    S: EntryStore<CacheKey, Envelope>,
    V: VaryProvider,
    D: DependencyProvider<CacheKey>,
{
    /// Creates a builder over `providers`, reading time from `clock`.
    #[must_use]
    pub fn builder(clock: Clock, providers: Providers<S, V, D>) -> HttpCacheBuilder<S, V, D> {
        HttpCacheBuilder::new(clock, providers)
    }

    /// The name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// The clock freshness is evaluated against.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// The configured policy.
    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// The providers the cache runs on.
    #[must_use]
    pub fn providers(&self) -> &Providers<S, V, D> {
        &self.providers
    }

    /// Decides how `request` should be sent, using the configured policy.
    ///
    /// # Errors
    ///
    /// In strict mode, returns provider read failures. Returns
    /// [`ErrorKind::TypeMismatch`] when the key holds a foreign value and mismatches are
    /// not suppressed.
    pub async fn prepare(&self, request: &CacheRequest) -> Result<PrepareDecision, Error> {
        self.prepare_with(request, &self.policy).await
    }

    /// Decides how `request` should be sent under `policy`.
    ///
    /// # Errors
    ///
    /// See [`prepare`](Self::prepare).
    pub async fn prepare_with(&self, request: &CacheRequest, policy: &CachePolicy) -> Result<PrepareDecision, Error> {
        let operation = CacheOperation::Prepare;
        let timer = Timer::start(&self.clock);

        if !policy.is_cacheable_method(request.method()) || !policy.validators().request().is_cacheable(request) {
            self.record(operation, CacheActivity::Bypass, &timer);
            return Ok(PrepareDecision::ProceedPlain);
        }

        let resource = ResourceId::new(request.method(), request.uri());
        let vary = match self.providers.vary().get_vary(&resource).await {
            Ok(vary) => vary,
            Err(e) => {
                self.read_failure(operation, e)?;
                return Ok(PrepareDecision::ProceedPlain);
            }
        };

        let key = CacheKey::compute(&resource, &vary, request.headers());
        let Some(entry) = self.load(operation, &key).await? else {
            self.record(operation, CacheActivity::Miss, &timer);
            return Ok(PrepareDecision::ProceedPlain);
        };

        match classify(Some(&entry), request.method(), self.clock.system_time(), policy) {
            Freshness::Fresh { served_stale } => {
                let activity = if served_stale {
                    CacheActivity::StaleHit
                } else {
                    CacheActivity::Hit
                };
                self.record(operation, activity, &timer);
                Ok(PrepareDecision::ServeFromCache(entry))
            }
            Freshness::StaleRevalidatable => {
                self.record(operation, CacheActivity::Revalidate, &timer);
                let headers = entry.conditional_headers();
                Ok(PrepareDecision::ProceedConditional { entry, headers })
            }
            Freshness::StaleUnusable | Freshness::NotApplicable => {
                self.record(operation, CacheActivity::Expired, &timer);
                Ok(PrepareDecision::ProceedPlain)
            }
        }
    }

    /// Applies a completed exchange to the cache, using the configured policy.
    ///
    /// # Errors
    ///
    /// Only the lookup behind a `304 Not Modified` can fail, under the same conditions as
    /// [`prepare`](Self::prepare). Write failures are reported as
    /// [`SkipReason::ProviderFailure`].
    pub async fn complete(&self, request: &CacheRequest, response: &CacheResponse) -> Result<CompleteOutcome, Error> {
        self.complete_with(request, response, &self.policy).await
    }

    /// Applies a completed exchange to the cache under `policy`.
    ///
    /// # Errors
    ///
    /// See [`complete`](Self::complete).
    pub async fn complete_with(
        &self,
        request: &CacheRequest,
        response: &CacheResponse,
        policy: &CachePolicy,
    ) -> Result<CompleteOutcome, Error> {
        let timer = Timer::start(&self.clock);

        let outcome = if !policy.is_cacheable_method(request.method()) {
            if request.method().is_safe() {
                CompleteOutcome::Skipped(SkipReason::MethodNotCacheable)
            } else {
                self.apply_mutation(request, response).await
            }
        } else if response.status() == StatusCode::NOT_MODIFIED {
            self.apply_not_modified(request, response, policy).await?
        } else {
            self.apply_response(request, response, policy).await
        };

        let activity = match &outcome {
            CompleteOutcome::Stored(_) => CacheActivity::Stored,
            CompleteOutcome::Refreshed(_) => CacheActivity::Refreshed,
            CompleteOutcome::Invalidated(_) => CacheActivity::Invalidated,
            CompleteOutcome::Skipped(_) => CacheActivity::Skipped,
        };
        self.record(CacheOperation::Complete, activity, &timer);

        Ok(outcome)
    }

    /// Removes every entry that depends on `uri` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns the dependency provider's error. Failures deleting individual entries are
    /// logged and skipped.
    pub async fn invalidate(&self, uri: &http::Uri) -> Result<usize, Error> {
        let operation = CacheOperation::Invalidate;
        let timer = Timer::start(&self.clock);

        let keys = self
            .providers
            .dependencies()
            .invalidate(uri)
            .await
            .inspect_err(|e| self.record_failure(operation, CacheActivity::Error, e))?;
        for key in &keys {
            self.drop_entry(operation, key).await;
        }

        self.record(operation, CacheActivity::Invalidated, &timer);
        Ok(keys.len())
    }

    /// Removes the entry `request` would be served from.
    ///
    /// # Errors
    ///
    /// Returns the first provider error.
    pub async fn remove(&self, request: &CacheRequest) -> Result<(), Error> {
        let operation = CacheOperation::Remove;
        let timer = Timer::start(&self.clock);

        let result = async {
            let resource = ResourceId::new(request.method(), request.uri());
            let vary = self.providers.vary().get_vary(&resource).await?;
            let key = CacheKey::compute(&resource, &vary, request.headers());
            self.providers.store().invalidate(&key).await?;
            self.providers.dependencies().deregister(&key).await
        }
        .await;

        match &result {
            Ok(()) => self.record(operation, CacheActivity::Removed, &timer),
            Err(e) => self.record_failure(operation, CacheActivity::Error, e),
        }
        result
    }

    /// Clears the entry store and forgets every vary and dependency record.
    ///
    /// # Errors
    ///
    /// Returns the first provider error; later providers are not cleared.
    pub async fn reset(&self) -> Result<(), Error> {
        let operation = CacheOperation::Reset;
        let timer = Timer::start(&self.clock);

        let result = async {
            self.providers.store().clear().await?;
            self.providers.vary().clear().await?;
            self.providers.dependencies().clear().await
        }
        .await;

        match &result {
            Ok(()) => self.record(operation, CacheActivity::Cleared, &timer),
            Err(e) => self.record_failure(operation, CacheActivity::Error, e),
        }
        result
    }

    async fn apply_mutation(&self, request: &CacheRequest, response: &CacheResponse) -> CompleteOutcome {
        if !response.status().is_success() {
            return CompleteOutcome::Skipped(SkipReason::UnsuccessfulMutation);
        }

        let mut targets = declared_dependents(request, response);
        let base = request.uri();
        for name in [LOCATION, CONTENT_LOCATION] {
            let location = response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| resolve(base, value))
                .filter(|uri| same_origin(base, uri));
            if let Some(uri) = location {
                targets.insert(canonical_uri(&uri));
            }
        }

        let mut removed = BTreeSet::new();
        for uri in &targets {
            match self.providers.dependencies().invalidate_canonical(uri).await {
                Ok(keys) => removed.extend(keys),
                Err(e) => self.record_failure(CacheOperation::Complete, CacheActivity::ProviderFailure, &e),
            }
        }
        for key in &removed {
            self.drop_entry(CacheOperation::Complete, key).await;
        }

        CompleteOutcome::Invalidated(removed.len())
    }

    async fn apply_not_modified(
        &self,
        request: &CacheRequest,
        response: &CacheResponse,
        policy: &CachePolicy,
    ) -> Result<CompleteOutcome, Error> {
        let operation = CacheOperation::Complete;
        let resource = ResourceId::new(request.method(), request.uri());
        let vary = match self.providers.vary().get_vary(&resource).await {
            Ok(vary) => vary,
            Err(e) => {
                self.read_failure(operation, e)?;
                return Ok(CompleteOutcome::Skipped(SkipReason::ProviderFailure));
            }
        };

        let key = CacheKey::compute(&resource, &vary, request.headers());
        let Some(mut entry) = self.load(operation, &key).await? else {
            return Ok(CompleteOutcome::Skipped(SkipReason::NoEntryToRefresh));
        };

        if !policy.validators().revalidation().accepts(&entry, response) {
            return Ok(CompleteOutcome::Skipped(SkipReason::RevalidationRejected));
        }

        entry.refresh(response.headers(), self.clock.system_time(), *policy.default_ttl().value());

        if let Err(e) = self.write(&key, &entry).await {
            self.record_failure(operation, CacheActivity::ProviderFailure, &e);
            return Ok(CompleteOutcome::Skipped(SkipReason::ProviderFailure));
        }

        Ok(CompleteOutcome::Refreshed(entry))
    }

    async fn apply_response(&self, request: &CacheRequest, response: &CacheResponse, policy: &CachePolicy) -> CompleteOutcome {
        if CacheControl::from_headers(request.headers()).no_store() {
            return CompleteOutcome::Skipped(SkipReason::RequestNotCacheable);
        }
        if CacheControl::from_headers(response.headers()).no_store() {
            return CompleteOutcome::Skipped(SkipReason::NoStore);
        }
        if !policy.is_cacheable_status(response.status()) {
            return CompleteOutcome::Skipped(SkipReason::StatusNotCacheable);
        }
        let VarySpec::Names(vary) = VarySpec::from_headers(response.headers()) else {
            return CompleteOutcome::Skipped(SkipReason::VaryAny);
        };
        if !policy.validators().response().is_storable(request, response) {
            return CompleteOutcome::Skipped(SkipReason::RejectedByValidator);
        }

        let operation = CacheOperation::Complete;
        let resource = ResourceId::new(request.method(), request.uri());
        if let Err(e) = self.providers.vary().record_vary(&resource, &vary).await {
            self.record_failure(operation, CacheActivity::ProviderFailure, &e);
            return CompleteOutcome::Skipped(SkipReason::ProviderFailure);
        }

        let key = CacheKey::compute(&resource, &vary, request.headers());
        let entry = CacheEntry::from_response(
            response.status(),
            response.headers(),
            response.body().clone(),
            self.clock.system_time(),
            *policy.default_ttl().value(),
            vary,
            declared_dependents(request, response),
        );

        if let Err(e) = self.write(&key, &entry).await {
            self.record_failure(operation, CacheActivity::ProviderFailure, &e);
            return CompleteOutcome::Skipped(SkipReason::ProviderFailure);
        }

        CompleteOutcome::Stored(key)
    }

    /// Registers the entry's dependents, then writes the entry.
    ///
    /// Registration comes first so an interrupted write leaves at most a dangling
    /// registration, which the next miss reconciles.
    async fn write(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        for uri in entry.dependent_uris() {
            self.providers.dependencies().register_canonical(uri, key).await?;
        }
        self.providers.store().insert_typed(key, entry).await
    }

    /// Reads the entry under `key`, reconciling the dependency index on a miss.
    ///
    /// Corrupt entries are deleted and read as misses. Other failures are returned in
    /// strict mode and read as misses otherwise, except type mismatches, which follow the
    /// configured [`MismatchPolicy`].
    async fn load(&self, operation: CacheOperation, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        match self.providers.store().get_typed::<CacheEntry>(key, self.mismatch).await {
            Ok(Some(entry)) => Ok(Some(entry)),
            Ok(None) => {
                if let Err(e) = self.providers.dependencies().deregister(key).await {
                    self.record_failure(operation, CacheActivity::ProviderFailure, &e);
                }
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::CorruptEntry => {
                self.record_failure(operation, CacheActivity::Corrupt, &e);
                self.drop_entry(operation, key).await;
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::TypeMismatch => {
                self.record_failure(operation, CacheActivity::Error, &e);
                Err(e)
            }
            Err(e) => {
                self.read_failure(operation, e)?;
                Ok(None)
            }
        }
    }

    /// Deletes the entry and its registrations, logging failures.
    async fn drop_entry(&self, operation: CacheOperation, key: &CacheKey) {
        if let Err(e) = self.providers.store().invalidate(key).await {
            self.record_failure(operation, CacheActivity::ProviderFailure, &e);
        }
        if let Err(e) = self.providers.dependencies().deregister(key).await {
            self.record_failure(operation, CacheActivity::ProviderFailure, &e);
        }
    }

    /// Returns `error` in strict mode; otherwise logs it so the caller can continue.
    fn read_failure(&self, operation: CacheOperation, error: Error) -> Result<(), Error> {
        if self.strict {
            self.record_failure(operation, CacheActivity::Error, &error);
            return Err(error);
        }
        self.record_failure(operation, CacheActivity::ProviderFailure, &error);
        Ok(())
    }

    fn record(&self, operation: CacheOperation, activity: CacheActivity, timer: &Timer) {
        self.telemetry
            .record(self.name, operation, activity, Some(timer.elapsed(&self.clock)));
    }

    fn record_failure(&self, operation: CacheOperation, activity: CacheActivity, error: &Error) {
        self.telemetry.record_failure(self.name, operation, activity, error);
    }
}

/// The canonical URIs an exchange depends on: its own URI plus every declared one.
fn declared_dependents(request: &CacheRequest, response: &CacheResponse) -> BTreeSet<String> {
    let base = request.uri();
    let mut uris = BTreeSet::from([canonical_uri(base)]);
    uris.extend(
        request
            .dependent_uris()
            .iter()
            .chain(response.dependent_uris())
            .filter_map(|reference| resolve(base, reference))
            .map(|uri| canonical_uri(&uri)),
    );
    uris
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use std::time::{Duration, SystemTime};

    use futures::executor::block_on;
    use http::Method;
    use http::header::{CACHE_CONTROL, ETAG};
    use tick::ClockControl;

    use super::*;
    use crate::telemetry::testing::LogCapture;

    fn control() -> ClockControl {
        ClockControl::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }

    fn ok(cache_control: &str) -> CacheResponse {
        CacheResponse::new(StatusCode::OK)
            .with_header(CACHE_CONTROL, cache_control.parse().unwrap())
            .with_header(ETAG, "\"v1\"".parse().unwrap())
            .with_body("payload")
    }

    #[test]
    fn dependents_include_own_and_declared_uris() {
        let request = CacheRequest::get("https://Api.example.com/orders/7".parse().unwrap()).depends_on("/orders");
        let response = CacheResponse::new(StatusCode::OK).depends_on("https://other.example.com/x");

        let uris = declared_dependents(&request, &response);

        assert_eq!(
            uris.into_iter().collect::<Vec<_>>(),
            [
                "https://api.example.com/orders",
                "https://api.example.com/orders/7",
                "https://other.example.com/x"
            ]
        );
    }

    #[test]
    fn stored_entry_registers_its_dependents() {
        let cache = HttpCache::builder(control().to_clock(), Providers::in_memory()).build().unwrap();
        let request = CacheRequest::get("https://a.com/orders/7".parse().unwrap()).depends_on("/orders");

        let CompleteOutcome::Stored(key) = block_on(cache.complete(&request, &ok("max-age=60"))).unwrap() else {
            panic!("response should be stored");
        };

        let index = cache.providers().dependencies().provider();
        assert_eq!(index.keys_for("https://a.com/orders"), [key.clone()]);
        assert_eq!(index.keys_for("https://a.com/orders/7"), [key]);
    }

    #[test]
    fn miss_deregisters_dangling_key() {
        let cache = HttpCache::builder(control().to_clock(), Providers::in_memory()).build().unwrap();
        let request = CacheRequest::get("https://a.com/x".parse().unwrap());
        let resource = ResourceId::new(&Method::GET, request.uri());
        let key = CacheKey::compute(&resource, &BTreeSet::new(), request.headers());
        block_on(cache.providers().dependencies().register(request.uri(), &key)).unwrap();

        assert!(block_on(cache.prepare(&request)).unwrap().is_plain());
        assert_eq!(cache.providers().dependencies().provider().uri_count(), 0);
    }

    #[test]
    fn activities_are_logged_when_enabled() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let cache = HttpCache::builder(control().to_clock(), Providers::in_memory())
            .name("orders")
            .logs()
            .build()
            .unwrap();
        let request = CacheRequest::get("https://a.com/x".parse().unwrap());

        block_on(cache.prepare(&request)).unwrap();
        block_on(cache.complete(&request, &ok("max-age=60"))).unwrap();
        block_on(cache.prepare(&request)).unwrap();

        capture.assert_contains("orders");
        capture.assert_contains("cache.miss");
        capture.assert_contains("cache.stored");
        capture.assert_contains("cache.hit");
    }

    #[test]
    fn routine_activities_are_quiet_by_default() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let cache = HttpCache::builder(control().to_clock(), Providers::in_memory()).build().unwrap();
        let request = CacheRequest::get("https://a.com/x".parse().unwrap());

        block_on(cache.prepare(&request)).unwrap();
        block_on(cache.complete(&request, &ok("max-age=60"))).unwrap();

        assert!(capture.output().is_empty());
    }

    #[test]
    fn refresh_re_registers_dependents() {
        let control = control();
        let cache = HttpCache::builder(control.to_clock(), Providers::in_memory()).build().unwrap();
        let request = CacheRequest::get("https://a.com/x".parse().unwrap());
        block_on(cache.complete(&request, &ok("max-age=60"))).unwrap();
        block_on(cache.providers().dependencies().clear()).unwrap();

        control.advance(Duration::from_secs(61));
        let not_modified = CacheResponse::new(StatusCode::NOT_MODIFIED).with_header(ETAG, "\"v1\"".parse().unwrap());
        let outcome = block_on(cache.complete(&request, &not_modified)).unwrap();

        assert!(matches!(outcome, CompleteOutcome::Refreshed(_)));
        assert_eq!(cache.providers().dependencies().provider().keys_for("https://a.com/x").len(), 1);
    }
}
