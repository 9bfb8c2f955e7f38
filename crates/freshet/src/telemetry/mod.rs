// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and metrics for cache operations.
//!
//! Every operation reports an activity through [`CacheTelemetry::record`]. Routine
//! activities (hits, stores, invalidations) are logged only when logs are enabled on the
//! builder; provider failures are always logged. With the `metrics` feature, each
//! activity also increments `cache.event.count` and records `cache.operation.duration`.

use std::time::Duration;

use freshet_store::Error;
use tick::Clock;
use tracing::Level;

pub(crate) mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

/// Identifies a cache instance in telemetry.
pub type CacheName = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Prepare,
    Complete,
    Invalidate,
    Remove,
    Reset,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "cache.prepare",
            Self::Complete => "cache.complete",
            Self::Invalidate => "cache.invalidate",
            Self::Remove => "cache.remove",
            Self::Reset => "cache.reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    StaleHit,
    Miss,
    Bypass,
    Revalidate,
    Expired,
    Stored,
    Refreshed,
    Invalidated,
    Skipped,
    Removed,
    Cleared,
    Corrupt,
    ProviderFailure,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::StaleHit => "cache.stale_hit",
            Self::Miss => "cache.miss",
            Self::Bypass => "cache.bypass",
            Self::Revalidate => "cache.revalidate",
            Self::Expired => "cache.expired",
            Self::Stored => "cache.stored",
            Self::Refreshed => "cache.refreshed",
            Self::Invalidated => "cache.invalidated",
            Self::Skipped => "cache.skipped",
            Self::Removed => "cache.removed",
            Self::Cleared => "cache.cleared",
            Self::Corrupt => "cache.corrupt",
            Self::ProviderFailure => "cache.provider_failure",
            Self::Error => "cache.error",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Hit | Self::StaleHit | Self::Miss | Self::Bypass | Self::Skipped => Level::DEBUG,
            Self::Revalidate | Self::Expired | Self::Stored | Self::Refreshed | Self::Invalidated | Self::Removed | Self::Cleared => {
                Level::INFO
            }
            Self::Corrupt | Self::ProviderFailure => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// Records cache activities as tracing events and, optionally, metrics.
#[derive(Clone, Debug, Default)]
pub(crate) struct CacheTelemetry {
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    metrics: Option<metrics::CacheMetrics>,
}

impl CacheTelemetry {
    pub(crate) fn new(logs_enabled: bool) -> Self {
        Self {
            logs_enabled,
            #[cfg(any(feature = "metrics", test))]
            metrics: None,
        }
    }

    pub(crate) fn with_logs(mut self, enabled: bool) -> Self {
        self.logs_enabled = enabled;
        self
    }

    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn with_meter(mut self, meter: &opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(metrics::CacheMetrics::new(meter));
        self
    }

    pub(crate) fn record(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        self.record_metrics(name, operation, activity, duration);

        if self.logs_enabled || activity.level() <= Level::WARN {
            Self::emit(name, operation, activity, duration, None);
        }
    }

    /// Records a failure; failures are logged whether or not logs are enabled.
    pub(crate) fn record_failure(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, error: &Error) {
        self.record_metrics(name, operation, activity, None);
        Self::emit(name, operation, activity, None, Some(error));
    }

    #[cfg_attr(
        not(any(feature = "metrics", test)),
        expect(unused_variables, clippy::unused_self, reason = "no-op without metrics")
    )]
    fn record_metrics(&self, name: CacheName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(m) = &self.metrics {
            use opentelemetry::KeyValue;

            let attrs = [
                KeyValue::new(attributes::CACHE_NAME, name),
                KeyValue::new(attributes::CACHE_OPERATION_NAME, operation.as_str()),
                KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
            ];
            m.event_counter.add(1, &attrs);
            if let Some(d) = duration {
                m.operation_duration.record(d.as_secs_f64(), &attrs);
            }
        }
    }

    fn emit(name: CacheName, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>, error: Option<&Error>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_ns = duration.map(|d| d.as_nanos());
        let error = error.map(tracing::field::display);

        // Field names must match the constants in attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = name,
                    cache.operation = op,
                    cache.activity = act,
                    cache.duration_ns = ?duration_ns,
                    error = error,
                    "freshet.event"
                )
            };
        }

        match activity.level() {
            Level::ERROR => emit_event!(error),
            Level::WARN => emit_event!(warn),
            Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}

/// Measures how long an operation takes on the cache's clock.
#[derive(Debug)]
pub(crate) struct Timer {
    start: std::time::Instant,
}

impl Timer {
    pub(crate) fn start(clock: &Clock) -> Self {
        Self { start: clock.instant() }
    }

    pub(crate) fn elapsed(&self, clock: &Clock) -> Duration {
        clock.instant().saturating_duration_since(self.start)
    }
}
