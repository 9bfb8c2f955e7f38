// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Collectors for asserting on emitted logs and metrics in unit tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics, ScopeMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
use tracing_subscriber::fmt::MakeWriter;

/// Gathers exported metrics in memory.
#[derive(Debug)]
pub(crate) struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl MetricTester {
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();
        Self { exporter, provider }
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    fn finished(&self) -> Vec<ResourceMetrics> {
        self.provider.force_flush().unwrap();
        self.exporter.get_finished_metrics().unwrap()
    }

    pub fn assert_attributes_contain(&self, expected: &[KeyValue]) {
        let finished = self.finished();
        let attributes: Vec<KeyValue> = metrics_of(&finished).flat_map(attributes_of).collect();
        for attr in expected {
            assert!(attributes.contains(attr), "missing {attr:?} in {attributes:?}");
        }
    }

    pub fn assert_metric_names_contain(&self, expected: &[&str]) {
        let finished = self.finished();
        let names: Vec<&str> = metrics_of(&finished).map(Metric::name).collect();
        for name in expected {
            assert!(names.contains(name), "missing metric {name} in {names:?}");
        }
    }
}

fn metrics_of(finished: &[ResourceMetrics]) -> impl Iterator<Item = &Metric> {
    finished
        .iter()
        .flat_map(ResourceMetrics::scope_metrics)
        .flat_map(ScopeMetrics::metrics)
}

macro_rules! points_attributes {
    ($data:expr) => {
        match $data {
            MetricData::Gauge(d) => d.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
            MetricData::Sum(d) => d.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
            MetricData::Histogram(d) => d.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
            MetricData::ExponentialHistogram(d) => d.data_points().flat_map(|p| p.attributes().cloned()).collect::<Vec<_>>(),
        }
    };
}

fn attributes_of(metric: &Metric) -> Vec<KeyValue> {
    match metric.data() {
        AggregatedMetrics::F64(data) => points_attributes!(data),
        AggregatedMetrics::U64(data) => points_attributes!(data),
        AggregatedMetrics::I64(data) => points_attributes!(data),
    }
}

/// Captures formatted `tracing` output for the current thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "expected '{expected}' in:\n{output}");
    }

    /// A subscriber writing every level into this capture; install with `set_default`.
    pub fn subscriber(&self) -> impl tracing::Subscriber {
        use tracing_subscriber::layer::SubscriberExt;

        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.buffer))
    }
}

pub(crate) struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
