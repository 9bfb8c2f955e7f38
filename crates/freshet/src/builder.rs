// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache construction: the provider bundle and the cache builder.

use freshet_store::{DependencyProvider, EntryStore, Envelope, Error, MismatchPolicy, VaryProvider};
use tick::Clock;

#[cfg(feature = "memory")]
use freshet_memory::{InMemoryDependencyIndex, InMemoryStore, InMemoryVaryProvider};

use crate::cache::HttpCache;
use crate::dependency::DependencyIndex;
use crate::key::CacheKey;
use crate::policy::CachePolicy;
use crate::telemetry::{CacheName, CacheTelemetry};
use crate::vary::VaryResolver;

/// The storage providers a cache runs on.
///
/// A cache needs three collaborators: an entry store holding encoded [`CacheEntry`](crate::CacheEntry)
/// envelopes, a vary provider remembering which request headers each resource varies on,
/// and a dependency provider indexing which keys depend on which URIs. Each cache owns
/// its providers; nothing is registered globally.
///
/// # Examples
///
/// ```
/// use freshet::{EntryStore, Providers};
/// use freshet_memory::{InMemoryDependencyIndex, InMemoryStore, InMemoryVaryProvider};
///
/// let providers = Providers::new(
///     InMemoryStore::with_capacity(1_000),
///     InMemoryVaryProvider::new(),
///     InMemoryDependencyIndex::new(),
/// );
/// assert_eq!(providers.store().len(), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct Providers<S, V, D> {
    store: S,
    vary: VaryResolver<V>,
    dependencies: DependencyIndex<D>,
}

impl<S, V, D> Providers<S, V, D>
where
    S: EntryStore<CacheKey, Envelope>,
    V: VaryProvider,
    D: DependencyProvider<CacheKey>,
{
    /// Bundles the three providers.
    #[must_use]
    pub fn new(store: S, vary: V, dependencies: D) -> Self {
        Self {
            store,
            vary: VaryResolver::new(vary),
            dependencies: DependencyIndex::new(dependencies),
        }
    }

    /// Replaces the entry store.
    #[must_use]
    pub fn with_store<S2>(self, store: S2) -> Providers<S2, V, D>
    where
        S2: EntryStore<CacheKey, Envelope>,
    {
        Providers {
            store,
            vary: self.vary,
            dependencies: self.dependencies,
        }
    }

    /// Replaces the vary provider.
    #[must_use]
    pub fn with_vary<V2>(self, vary: V2) -> Providers<S, V2, D>
    where
        V2: VaryProvider,
    {
        Providers {
            store: self.store,
            vary: VaryResolver::new(vary),
            dependencies: self.dependencies,
        }
    }

    /// Replaces the dependency provider.
    #[must_use]
    pub fn with_dependencies<D2>(self, dependencies: D2) -> Providers<S, V, D2>
    where
        D2: DependencyProvider<CacheKey>,
    {
        Providers {
            store: self.store,
            vary: self.vary,
            dependencies: DependencyIndex::new(dependencies),
        }
    }

    /// The entry store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The vary resolver over the vary provider.
    #[must_use]
    pub fn vary(&self) -> &VaryResolver<V> {
        &self.vary
    }

    /// The dependency index over the dependency provider.
    #[must_use]
    pub fn dependencies(&self) -> &DependencyIndex<D> {
        &self.dependencies
    }
}

#[cfg(feature = "memory")]
impl Providers<InMemoryStore<CacheKey, Envelope>, InMemoryVaryProvider, InMemoryDependencyIndex<CacheKey>> {
    /// Unbounded in-memory providers.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new(), InMemoryVaryProvider::new(), InMemoryDependencyIndex::new())
    }
}

/// Builder for [`HttpCache`].
///
/// Created by [`HttpCache::builder`].
///
/// # Examples
///
/// ```
/// use freshet::{CachePolicy, HttpCache, Providers};
/// use tick::Clock;
///
/// let cache = HttpCache::builder(Clock::new_frozen(), Providers::in_memory())
///     .name("catalog")
///     .policy(CachePolicy::default())
///     .logs()
///     .build()?;
///
/// assert_eq!(cache.name(), "catalog");
/// # Ok::<(), freshet::Error>(())
/// ```
#[derive(Debug)]
pub struct HttpCacheBuilder<S, V, D> {
    name: CacheName,
    clock: Clock,
    providers: Providers<S, V, D>,
    policy: CachePolicy,
    strict: bool,
    mismatch: MismatchPolicy,
    telemetry: CacheTelemetry,
}

impl<S, V, D> HttpCacheBuilder<S, V, D>
where
    S: EntryStore<CacheKey, Envelope>,
    V: VaryProvider,
    D: DependencyProvider<CacheKey>,
{
    pub(crate) fn new(clock: Clock, providers: Providers<S, V, D>) -> Self {
        Self {
            name: "freshet",
            clock,
            providers,
            policy: CachePolicy::default(),
            strict: false,
            mismatch: MismatchPolicy::Raise,
            telemetry: CacheTelemetry::default(),
        }
    }

    /// Names the cache in logs and metrics. Defaults to `"freshet"`.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets the policy used by [`HttpCache::prepare`] and [`HttpCache::complete`].
    #[must_use]
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns provider read failures to the caller instead of treating them as misses.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Treats stored values of a foreign type as misses instead of errors.
    #[must_use]
    pub fn suppress_type_mismatch(mut self, suppress: bool) -> Self {
        self.mismatch = if suppress {
            MismatchPolicy::TreatAsMiss
        } else {
            MismatchPolicy::Raise
        };
        self
    }

    /// Emits a `tracing` event for every cache activity.
    ///
    /// Without this only provider failures and errors are logged.
    #[must_use]
    pub fn logs(mut self) -> Self {
        self.telemetry = self.telemetry.with_logs(true);
        self
    }

    /// Records OpenTelemetry metrics through `meter_provider`.
    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn metrics(mut self, meter_provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        let meter = crate::telemetry::metrics::create_meter(meter_provider);
        self.telemetry = self.telemetry.with_meter(&meter);
        self
    }

    /// Builds the cache.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidConfig`](freshet_store::ErrorKind::InvalidConfig)
    /// error if the name is empty.
    pub fn build(self) -> Result<HttpCache<S, V, D>, Error> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_config("cache name must not be empty"));
        }

        Ok(HttpCache {
            name: self.name,
            clock: self.clock,
            policy: self.policy,
            providers: self.providers,
            telemetry: self.telemetry,
            strict: self.strict,
            mismatch: self.mismatch,
        })
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use freshet_store::ErrorKind;

    use super::*;

    #[test]
    fn defaults() {
        let cache = HttpCache::builder(Clock::new_frozen(), Providers::in_memory()).build().unwrap();
        assert_eq!(cache.name(), "freshet");
        assert!(!cache.strict);
        assert_eq!(cache.mismatch, MismatchPolicy::Raise);
        assert!(!cache.policy().default_ttl().is_explicit());
    }

    #[test]
    fn empty_name_is_rejected() {
        let error = HttpCache::builder(Clock::new_frozen(), Providers::in_memory())
            .name("  ")
            .build()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn flags_reach_the_cache() {
        let cache = HttpCache::builder(Clock::new_frozen(), Providers::in_memory())
            .strict()
            .suppress_type_mismatch(true)
            .build()
            .unwrap();
        assert!(cache.strict);
        assert_eq!(cache.mismatch, MismatchPolicy::TreatAsMiss);
    }

    #[test]
    fn providers_can_be_swapped() {
        let providers = Providers::in_memory().with_store(InMemoryStore::<CacheKey, Envelope>::with_capacity(10));
        assert_eq!(providers.store().len(), Some(0));
        assert_eq!(providers.vary().provider().len(), 0);
        assert_eq!(providers.dependencies().provider().uri_count(), 0);
    }
}
