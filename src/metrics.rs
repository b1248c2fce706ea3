//! Exporter Operational Metrics
//!
//! Metrics about the exporter itself, kept in a private Prometheus registry and
//! appended after the monitor metrics on every scrape.
//!
//! # Metrics
//!
//! - `uptimerobot_exporter_collections_total{result}` - Collection cycles by outcome
//! - `uptimerobot_exporter_collection_errors_total{kind}` - Failed cycles by error kind
//! - `uptimerobot_exporter_last_success_timestamp_seconds` - End of the last successful cycle
//! - `uptimerobot_exporter_monitors` - Monitors in the current snapshot
//! - `uptimerobot_exporter_backoff_seconds` - Current retry delay (0 when healthy)
//!
//! All metrics use the `uptimerobot_exporter` namespace prefix.

use crate::error::ApiError;
use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

const NAMESPACE: &str = "uptimerobot_exporter";

#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Arc<Registry>,

    pub collections_total: Arc<IntCounterVec>,
    pub collection_errors_total: Arc<IntCounterVec>,
    pub last_success_timestamp_seconds: Arc<Gauge>,
    pub monitors: Arc<IntGauge>,
    pub backoff_seconds: Arc<Gauge>,
}

impl ExporterMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let collections_total = IntCounterVec::new(
            Opts::new("collections_total", "Collection cycles by result").namespace(NAMESPACE),
            &["result"],
        )?;

        let collection_errors_total = IntCounterVec::new(
            Opts::new(
                "collection_errors_total",
                "Failed collection cycles by error kind",
            )
            .namespace(NAMESPACE),
            &["kind"],
        )?;

        let last_success_timestamp_seconds = Gauge::with_opts(
            Opts::new(
                "last_success_timestamp_seconds",
                "Unix time of the last successful collection cycle",
            )
            .namespace(NAMESPACE),
        )?;

        let monitors = IntGauge::with_opts(
            Opts::new("monitors", "Number of monitors in the current snapshot")
                .namespace(NAMESPACE),
        )?;

        let backoff_seconds = Gauge::with_opts(
            Opts::new(
                "backoff_seconds",
                "Delay before the next attempt after a failed cycle",
            )
            .namespace(NAMESPACE),
        )?;

        registry.register(Box::new(collections_total.clone()))?;
        registry.register(Box::new(collection_errors_total.clone()))?;
        registry.register(Box::new(last_success_timestamp_seconds.clone()))?;
        registry.register(Box::new(monitors.clone()))?;
        registry.register(Box::new(backoff_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            collections_total: Arc::new(collections_total),
            collection_errors_total: Arc::new(collection_errors_total),
            last_success_timestamp_seconds: Arc::new(last_success_timestamp_seconds),
            monitors: Arc::new(monitors),
            backoff_seconds: Arc::new(backoff_seconds),
        })
    }

    pub fn record_success(&self, monitor_count: usize, finished_at_unix: f64) {
        self.collections_total.with_label_values(&["success"]).inc();
        self.last_success_timestamp_seconds.set(finished_at_unix);
        self.monitors.set(monitor_count as i64);
        self.backoff_seconds.set(0.0);
    }

    pub fn record_failure(&self, error: &ApiError, backoff: Duration) {
        self.collections_total.with_label_values(&["failure"]).inc();
        self.collection_errors_total
            .with_label_values(&[error.kind()])
            .inc();
        self.backoff_seconds.set(backoff.as_secs_f64());
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
