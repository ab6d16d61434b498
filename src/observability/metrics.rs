//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the process-wide Prometheus recorder exactly once
//! - Register runtime collectors and take their first sample
//! - Define HTTP request metrics (count, latency)
//! - Render the Prometheus text exposition format on scrape
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations in the recorder)
//! - `route` is the matched route template, so label cardinality is bounded
//!   by the router
//! - Histogram buckets tuned for typical web latencies

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::collectors::{CollectError, Collector};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";

/// Route label for requests that matched no registered route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

const HTTP_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
];

/// Error type for metrics initialization.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: {0}")]
    Install(#[from] BuildError),

    #[error("collector '{name}' failed its initial sample: {source}")]
    Collector {
        name: &'static str,
        #[source]
        source: CollectError,
    },
}

/// Handle to the installed recorder and the registered collectors.
///
/// Cloning is cheap; every clone refers to the same process-wide recorder.
#[derive(Clone)]
pub struct MetricsRegistry {
    handle: PrometheusHandle,
    collectors: Arc<Vec<Box<dyn Collector>>>,
}

impl MetricsRegistry {
    /// Install the global recorder and register `collectors`.
    ///
    /// Every collector must take a successful first sample, otherwise the
    /// whole registration fails. Must be called before any traffic is served.
    pub fn install(collectors: Vec<Box<dyn Collector>>) -> Result<Self, MetricsError> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(HTTP_REQUEST_DURATION.to_string()),
                HTTP_DURATION_BUCKETS,
            )?
            .install_recorder()?;

        describe_http_metrics();

        for collector in &collectors {
            collector.describe();
            collector.collect().map_err(|source| MetricsError::Collector {
                name: collector.name(),
                source,
            })?;
            tracing::debug!(collector = collector.name(), "Collector registered");
        }

        tracing::info!(collectors = collectors.len(), "Metrics registry initialized");

        Ok(Self {
            handle,
            collectors: Arc::new(collectors),
        })
    }

    /// Names of the registered collectors, in registration order.
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Refresh every collector. Failures after startup are logged, not fatal.
    pub fn collect(&self) {
        for collector in self.collectors.iter() {
            if let Err(e) = collector.collect() {
                tracing::warn!(collector = collector.name(), error = %e, "Collector sample failed");
            }
        }
    }

    /// Refresh collectors and render the Prometheus text format.
    pub fn render(&self) -> String {
        self.collect();
        self.handle.render()
    }

    /// Drain histogram buckets held by the recorder.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }

    /// Run upkeep and collector refresh every `interval` until shutdown.
    pub fn spawn_upkeep(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        registry.collect();
                        registry.run_upkeep();
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Metrics upkeep stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Final refresh at shutdown.
    pub fn flush(&self) {
        self.collect();
        self.run_upkeep();
        tracing::debug!("Metrics registry flushed");
    }
}

fn describe_http_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total HTTP requests handled");
    describe_histogram!(
        HTTP_REQUEST_DURATION,
        Unit::Seconds,
        "HTTP request latency"
    );
}

/// Record HTTP request completion.
///
/// Metric: `http_requests_total`, `http_request_duration_seconds`
/// Labels: `method`, `route`, `status`
pub fn record_http_request(method: &str, route: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(HTTP_REQUEST_DURATION, &labels).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_record_http_request_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_http_request("GET", "/x", 200, Duration::from_millis(12));
            record_http_request("GET", "/x", 200, Duration::from_millis(8));
            record_http_request("POST", "/x", 500, Duration::from_millis(3));
        });

        let snapshot = snapshotter.snapshot().into_vec();

        let get_ok = snapshot.iter().find(|(key, _, _, value)| {
            let k = key.key();
            k.name() == HTTP_REQUESTS_TOTAL
                && k.labels().any(|l| l.key() == "method" && l.value() == "GET")
                && k.labels().any(|l| l.key() == "route" && l.value() == "/x")
                && k.labels().any(|l| l.key() == "status" && l.value() == "200")
                && matches!(value, DebugValue::Counter(_))
        });
        match get_ok {
            Some((_, _, _, DebugValue::Counter(n))) => assert_eq!(*n, 2),
            other => panic!("missing GET /x counter: {other:?}"),
        }

        let latencies: usize = snapshot
            .iter()
            .filter(|(key, _, _, _)| key.key().name() == HTTP_REQUEST_DURATION)
            .map(|(_, _, _, value)| match value {
                DebugValue::Histogram(samples) => samples.len(),
                _ => 0,
            })
            .sum();
        assert_eq!(latencies, 3);
    }

    #[test]
    fn test_distinct_statuses_are_separate_series() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_http_request("GET", UNMATCHED_ROUTE, 404, Duration::from_millis(1));
            record_http_request("GET", UNMATCHED_ROUTE, 405, Duration::from_millis(1));
        });

        let counters = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == HTTP_REQUESTS_TOTAL)
            .count();
        assert_eq!(counters, 2);
    }
}
