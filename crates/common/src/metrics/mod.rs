//! Metrics and observability utilities
//!
//! Provides Prometheus metric descriptions and recording helpers
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all ContactDesk metrics
pub const METRICS_PREFIX: &str = "contactdesk";

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

/// Contact lifecycle events counted per tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Created,
    Updated,
    Deleted,
}

impl ContactEvent {
    fn metric_name(&self) -> String {
        let action = match self {
            ContactEvent::Created => "created",
            ContactEvent::Updated => "updated",
            ContactEvent::Deleted => "deleted",
        };
        format!("{}_contacts_{}_total", METRICS_PREFIX, action)
    }
}

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
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

    // Contact metrics
    describe_counter!(
        ContactEvent::Created.metric_name(),
        Unit::Count,
        "Total contacts created"
    );

    describe_counter!(
        ContactEvent::Updated.metric_name(),
        Unit::Count,
        "Total contacts updated"
    );

    describe_counter!(
        ContactEvent::Deleted.metric_name(),
        Unit::Count,
        "Total contacts deleted"
    );

    describe_counter!(
        format!("{}_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Requests rejected by the rate limiter"
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

/// Count a contact lifecycle event
pub fn record_contact(event: ContactEvent, tenant_id: &str) {
    counter!(event.metric_name(), "tenant" => tenant_id.to_string()).increment(1);
}

/// Count a request rejected by the rate limiter
pub fn record_rate_limited() {
    counter!(format!("{}_rate_limited_total", METRICS_PREFIX)).increment(1);
}
