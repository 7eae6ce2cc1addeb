//! HTTP surface tests, driving the router without binding a socket

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use form_notification_service::config::Settings;
use form_notification_service::notification::{
    MemoryConfigStore, MemoryMailTransport, NotificationConfigRecord,
    SubmissionNotificationService, TemplateRenderer,
};
use form_notification_service::server::{create_app, AppState};

const TEMPLATE: &str =
    "<mjml><mj-body><mj-section><mj-column><mj-text>Hello</mj-text></mj-column></mj-section></mj-body></mjml>";

fn app(api_key: Option<&str>) -> (Router, Arc<MemoryMailTransport>) {
    let store: MemoryConfigStore = [1, 2].into_iter().map(NotificationConfigRecord::empty).collect();
    let transport = Arc::new(MemoryMailTransport::new());
    let service = SubmissionNotificationService::new(
        Arc::new(store),
        transport.clone(),
        TemplateRenderer::default(),
    );

    let mut settings = Settings::default();
    settings.api.key = api_key.map(str::to_string);

    let state = AppState::new(settings, Arc::new(service), None);
    (create_app(state), transport)
}

fn submission_body(templates: &[&str]) -> Value {
    let notifications: Vec<Value> = templates
        .iter()
        .enumerate()
        .map(|(i, template)| {
            json!({
                "id": i + 1,
                "enabled": true,
                "to_email": "a@x.com",
                "from_email": "b@x.com",
                "subject": "New entry",
                "html_template": template,
            })
        })
        .collect();

    json!({
        "id": 77,
        "form_id": 5,
        "fields": [],
        "form": { "id": 5, "notifications": notifications }
    })
}

fn post(body: &Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/submissions")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app(None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["config_store"], "memory");
    assert_eq!(body["mail_transport"], "memory");
    assert!(body.get("postgres").is_none());
}

#[tokio::test]
async fn test_submission_all_sent() {
    let (app, transport) = app(None);

    let response = app.oneshot(post(&submission_body(&[TEMPLATE]), None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["submission_id"], 77);
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(transport.sent_count().await, 1);
}

#[tokio::test]
async fn test_submission_partial_failure_is_bad_gateway() {
    let (app, transport) = app(None);

    let response = app
        .oneshot(post(&submission_body(&[TEMPLATE, "<mjml><mj-body>"]), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["sent"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"][1]["status"], "failed");
    assert_eq!(body["results"][1]["error_kind"], "render");
    assert_eq!(transport.sent_count().await, 1);
}

#[tokio::test]
async fn test_mismatched_form_is_rejected() {
    let (app, transport) = app(None);

    let mut body = submission_body(&[TEMPLATE]);
    body["form_id"] = json!(6);

    let response = app.oneshot(post(&body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let (app, transport) = app(Some("secret"));
    let body = submission_body(&[TEMPLATE]);

    let missing = app.clone().oneshot(post(&body, None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = app.clone().oneshot(post(&body, Some("nope"))).await.unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = app.oneshot(post(&body, Some("secret"))).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(transport.sent_count().await, 1);
}

#[tokio::test]
async fn test_health_is_public_with_api_key() {
    let (app, _) = app(Some("secret"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposes_notification_counters() {
    let (app, _) = app(None);

    let sent = app
        .clone()
        .oneshot(post(&submission_body(&[TEMPLATE]), None))
        .await
        .unwrap();
    assert_eq!(sent.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("form_notifications_rules_total"));
}
