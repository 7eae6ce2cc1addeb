//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    DISPATCH_LATENCY, NOTIFICATIONS_TOTAL, NOTIFICATION_FAILURES_TOTAL, REDIS_MESSAGES_INVALID,
    REDIS_MESSAGES_RECEIVED, REDIS_RECONNECTIONS_TOTAL, RENDER_LATENCY,
    SUBMISSIONS_PROCESSED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording notification pipeline metrics
pub struct NotificationMetrics;

impl NotificationMetrics {
    pub fn record_sent() {
        NOTIFICATIONS_TOTAL.with_label_values(&["sent"]).inc();
    }

    pub fn record_skipped() {
        NOTIFICATIONS_TOTAL.with_label_values(&["skipped"]).inc();
    }

    /// Record a failed rule, labelled with the failing stage
    pub fn record_failed(kind: &str) {
        NOTIFICATIONS_TOTAL.with_label_values(&["failed"]).inc();
        NOTIFICATION_FAILURES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn record_submission() {
        SUBMISSIONS_PROCESSED_TOTAL.inc();
    }

    pub fn observe_render(elapsed: Duration) {
        RENDER_LATENCY.observe(elapsed.as_secs_f64());
    }

    pub fn observe_dispatch(elapsed: Duration) {
        DISPATCH_LATENCY.observe(elapsed.as_secs_f64());
    }
}

/// Helper struct for recording submission ingestion metrics
pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_redis_received() {
        REDIS_MESSAGES_RECEIVED.inc();
    }

    pub fn record_redis_invalid() {
        REDIS_MESSAGES_INVALID.inc();
    }

    pub fn record_redis_reconnect() {
        REDIS_RECONNECTIONS_TOTAL.inc();
    }
}
