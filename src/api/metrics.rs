use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::metrics::encode_metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics, Prometheus text exposition
pub async fn prometheus_metrics() -> Result<Response> {
    let body = encode_metrics()
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {e}")))?;

    Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response())
}
