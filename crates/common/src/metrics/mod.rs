//! Metrics and observability utilities
//!
//! Prometheus metrics for HTTP traffic and report lifecycle events, all
//! named with the `mcr_` prefix.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all service metrics
pub const METRICS_PREFIX: &str = "mcr";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_reports_created_total", METRICS_PREFIX),
        Unit::Count,
        "Reports started"
    );

    describe_counter!(
        format!("{}_reports_archived_total", METRICS_PREFIX),
        Unit::Count,
        "Reports archived by admins"
    );

    describe_counter!(
        format!("{}_reports_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Reports submitted"
    );

    describe_counter!(
        format!("{}_autosave_fields_total", METRICS_PREFIX),
        Unit::Count,
        "Autosaved fields by outcome"
    );

    describe_counter!(
        format!("{}_validation_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Form validations that rejected input"
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
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_report_created(report_type: &str, state: &str) {
    counter!(
        format!("{}_reports_created_total", METRICS_PREFIX),
        "report_type" => report_type.to_string(),
        "state" => state.to_string()
    )
    .increment(1);
}

pub fn record_report_archived(report_type: &str) {
    counter!(
        format!("{}_reports_archived_total", METRICS_PREFIX),
        "report_type" => report_type.to_string()
    )
    .increment(1);
}

pub fn record_report_submitted(report_type: &str) {
    counter!(
        format!("{}_reports_submitted_total", METRICS_PREFIX),
        "report_type" => report_type.to_string()
    )
    .increment(1);
}

/// Saved and skipped counts of one autosave request
pub fn record_autosave(saved: usize, skipped: usize) {
    counter!(
        format!("{}_autosave_fields_total", METRICS_PREFIX),
        "outcome" => "saved"
    )
    .increment(saved as u64);

    counter!(
        format!("{}_autosave_fields_total", METRICS_PREFIX),
        "outcome" => "skipped"
    )
    .increment(skipped as u64);
}

pub fn record_validation_failure(form_id: &str) {
    counter!(
        format!("{}_validation_failures_total", METRICS_PREFIX),
        "form" => form_id.to_string()
    )
    .increment(1);
}
