//! Prometheus metrics for the notification service.
//!
//! - Notification outcomes (sent, failed, skipped) and failures by kind
//! - Submissions processed
//! - Render and dispatch latency
//! - Redis pub/sub ingestion

mod helpers;

pub use helpers::{encode_metrics, IngestMetrics, NotificationMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "form_notifications";

lazy_static! {
    // ============================================================================
    // Notification Metrics
    // ============================================================================

    /// Notification rules processed, by outcome
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_rules_total", METRIC_PREFIX),
        "Notification rules processed by outcome",
        &["outcome"]
    ).unwrap();

    /// Notification failures, by pipeline stage
    pub static ref NOTIFICATION_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_failures_total", METRIC_PREFIX),
        "Notification failures by kind",
        &["kind"]
    ).unwrap();

    /// Submissions run through the pipeline
    pub static ref SUBMISSIONS_PROCESSED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_submissions_processed_total", METRIC_PREFIX),
        "Total submissions processed"
    ).unwrap();

    /// Template render latency
    pub static ref RENDER_LATENCY: Histogram = register_histogram!(
        format!("{}_render_latency_seconds", METRIC_PREFIX),
        "Template render latency in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    ).unwrap();

    /// Transport send latency
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Mail transport send latency in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Ingestion Metrics
    // ============================================================================

    /// Submission events received from Redis pub/sub
    pub static ref REDIS_MESSAGES_RECEIVED: IntCounter = register_int_counter!(
        format!("{}_redis_messages_received_total", METRIC_PREFIX),
        "Total submission events received from Redis pub/sub"
    ).unwrap();

    /// Redis payloads that could not be parsed as submissions
    pub static ref REDIS_MESSAGES_INVALID: IntCounter = register_int_counter!(
        format!("{}_redis_messages_invalid_total", METRIC_PREFIX),
        "Total Redis payloads rejected as invalid submissions"
    ).unwrap();

    /// Total Redis reconnection attempts
    pub static ref REDIS_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_redis_reconnections_total", METRIC_PREFIX),
        "Total Redis reconnection attempts"
    ).unwrap();
}
