//! Metrics and observability utilities
//!
//! Metric descriptions and recording helpers for the metrics-rs facade.
//! Recording is a no-op until a recorder is installed (the gateway installs
//! the Prometheus exporter; the console installs none).

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Chatbridge metrics
pub const METRICS_PREFIX: &str = "chatbridge";

/// Histogram buckets for HTTP request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Buckets for model generation latency (much slower than lookups)
pub const GENERATION_BUCKETS: &[f64] = &[
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    20.00,  // 20s
    30.00,  // 30s
    60.00,  // 60s
];

/// Full metric name under the service prefix
pub fn metric_name(suffix: &str) -> String {
    format!("{}_{}", METRICS_PREFIX, suffix)
}

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        metric_name("requests_total"),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        metric_name("request_duration_seconds"),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        metric_name("chat_requests_total"),
        Unit::Count,
        "Chat questions handled, by intent and surface"
    );

    describe_histogram!(
        metric_name("generation_duration_seconds"),
        Unit::Seconds,
        "Model generation latency in seconds"
    );

    describe_counter!(
        metric_name("generation_errors_total"),
        Unit::Count,
        "Failed model generations"
    );

    describe_counter!(
        metric_name("context_lookups_total"),
        Unit::Count,
        "Catalog lookups made while building context"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            metric_name("requests_total"),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            metric_name("request_duration_seconds"),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// One classified question, `surface` being `http` or `console`
pub fn record_chat(intent: &str, surface: &str) {
    counter!(
        metric_name("chat_requests_total"),
        "intent" => intent.to_string(),
        "surface" => surface.to_string()
    )
    .increment(1);
}

/// One generation call, `mode` being `blocking` or `stream`
pub fn record_generation(duration_secs: f64, mode: &str, success: bool) {
    histogram!(
        metric_name("generation_duration_seconds"),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    if !success {
        counter!(
            metric_name("generation_errors_total"),
            "mode" => mode.to_string()
        )
        .increment(1);
    }
}

/// One catalog lookup, `kind` being `product`, `device` or `device_category`
pub fn record_lookup(kind: &str, found: bool) {
    counter!(
        metric_name("context_lookups_total"),
        "kind" => kind.to_string(),
        "found" => found.to_string()
    )
    .increment(1);
}
