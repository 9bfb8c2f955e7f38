// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::{
    InstrumentationScope,
    metrics::{Counter, Histogram, Meter, MeterProvider},
};

const METER_NAME: &str = "freshet";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";
pub(crate) const CACHE_EVENT_COUNT_NAME: &str = "cache.event.count";
pub(crate) const CACHE_OPERATION_DURATION_NAME: &str = "cache.operation.duration";

pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

#[derive(Debug, Clone)]
pub(crate) struct CacheMetrics {
    pub(crate) event_counter: Counter<u64>,
    pub(crate) operation_duration: Histogram<f64>,
}

impl CacheMetrics {
    pub(crate) fn new(meter: &Meter) -> Self {
        Self {
            event_counter: meter
                .u64_counter(CACHE_EVENT_COUNT_NAME)
                .with_description("HTTP cache events")
                .with_unit("{event}")
                .build(),
            operation_duration: meter
                .f64_histogram(CACHE_OPERATION_DURATION_NAME)
                .with_description("HTTP cache operation duration")
                .with_unit("s")
                .build(),
        }
    }
}
