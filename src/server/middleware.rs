use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use super::AppState;

/// Header carrying the ingestion key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Guards submission ingestion with the configured `api.key`.
///
/// Without a configured key every request passes.
pub async fn api_key_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    check_api_key(state.settings.api.key.as_deref(), req.headers())?;
    Ok(next.run(req).await)
}

fn check_api_key(expected: Option<&str>, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match headers.get(API_KEY_HEADER).map(|v| v.to_str()) {
        Some(Ok(presented)) if presented == expected => Ok(()),
        Some(_) => {
            tracing::warn!("Rejected submission with invalid API key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!(header = API_KEY_HEADER, "Rejected submission without API key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
