//! Prometheus metrics collection for ollamaverse
//!
//! This module provides metrics instrumentation for tracking:
//! - Chat requests by model key and outcome
//! - Upstream generation latency by model key
//! - Stream lines skipped during reassembly
//! - Failed backend probes
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Label recorded for requests naming a model that is not in the registry
///
/// Caller-supplied keys are never used as label values directly, so label
/// cardinality stays bounded by the registry size.
pub const UNCONFIGURED_MODEL_LABEL: &str = "unconfigured";

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    upstream_duration: HistogramVec,
    stream_lines_skipped: IntCounterVec,
    probe_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: (models + 1) × outcomes
        let requests_total = IntCounterVec::new(
            Opts::new(
                "ollamaverse_requests_total",
                "Total number of chat requests by model key and outcome",
            ),
            &["model", "outcome"],
        )?;

        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "ollamaverse_upstream_duration_seconds",
                "Backend generation latency in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            &["model"],
        )?;

        let stream_lines_skipped = IntCounterVec::new(
            Opts::new(
                "ollamaverse_stream_lines_skipped_total",
                "Streamed backend lines skipped because they did not parse",
            ),
            &["model"],
        )?;

        let probe_failures = IntCounterVec::new(
            Opts::new(
                "ollamaverse_backend_probe_failures_total",
                "Backend reachability probes that failed",
            ),
            &["model"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(stream_lines_skipped.clone()))?;
        registry.register(Box::new(probe_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            upstream_duration,
            stream_lines_skipped,
            probe_failures,
        })
    }

    /// Record one finished chat request
    pub fn record_request(&self, model: &str, outcome: &str) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[model, outcome])?
            .inc();
        Ok(())
    }

    /// Record backend generation latency
    ///
    /// # Errors
    ///
    /// Rejects NaN, infinite or negative durations.
    pub fn record_upstream_duration(
        &self,
        model: &str,
        seconds: f64,
    ) -> Result<(), prometheus::Error> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "invalid upstream duration: {} (must be finite and non-negative)",
                seconds
            )));
        }
        self.upstream_duration
            .get_metric_with_label_values(&[model])?
            .observe(seconds);
        Ok(())
    }

    pub fn record_skipped_lines(&self, model: &str, count: usize) -> Result<(), prometheus::Error> {
        if count > 0 {
            self.stream_lines_skipped
                .get_metric_with_label_values(&[model])?
                .inc_by(count as u64);
        }
        Ok(())
    }

    pub fn record_probe_failure(&self, model: &str) -> Result<(), prometheus::Error> {
        self.probe_failures
            .get_metric_with_label_values(&[model])?
            .inc();
        Ok(())
    }

    /// Current request count for a label pair
    pub fn request_count(&self, model: &str, outcome: &str) -> u64 {
        self.requests_total
            .get_metric_with_label_values(&[model, outcome])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    pub fn skipped_lines_count(&self, model: &str) -> u64 {
        self.stream_lines_skipped
            .get_metric_with_label_values(&[model])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Encode all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics output is not UTF-8: {}", e)))
    }
}

/// Log a metrics recording failure without failing the request
pub fn log_recording_failure(operation: &str, result: Result<(), prometheus::Error>) {
    if let Err(e) = result {
        tracing::warn!(
            operation = %operation,
            error = %e,
            "Failed to record metric"
        );
    }
}
