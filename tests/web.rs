// HTTP surface tests, driven through the router without binding a socket.
//
// Configuration comes from a fixed lookup table: keyword scorer and the
// keyword template provider only, so nothing touches the network.

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use politely::config::Config;
use politely::moderation::ModerationPipeline;
use politely::web::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn app() -> axum::Router {
    let config = Config::from_lookup(|key| match key {
        "POLITELY_PROVIDERS" => Some("keyword".to_string()),
        "POLITELY_FALLBACK_PHRASE" => Some("Let's keep this friendly.".to_string()),
        _ => None,
    })
    .unwrap();
    let pipeline = Arc::new(ModerationPipeline::from_config(&config).unwrap());
    build_router(AppState::new(Arc::new(config), pipeline))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn moderate_request(body: &str) -> Request<Body> {
    Request::post("/moderate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn clean_text_is_allowed_unchanged() {
    let (status, body) = send(moderate_request(r#"{"text": "Good morning, team"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
    assert_eq!(body["is_toxic"], false);
    assert_eq!(body["delivered_text"], "Good morning, team");
    assert_eq!(body["used_provider"], "none");
}

#[tokio::test]
async fn toxic_text_is_rephrased_by_keyword_provider() {
    let (status, body) = send(moderate_request(r#"{"text": "you stupid idiot"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["original_text"], "you stupid idiot");
    assert_eq!(
        body["delivered_text"],
        "I respectfully disagree with that perspective."
    );
    assert_eq!(body["used_provider"], "keyword");
}

#[tokio::test]
async fn toxic_text_without_template_gets_fallback_phrase() {
    let (_, body) = send(moderate_request(r#"{"text": "shit, fuck this"}"#)).await;

    assert_eq!(body["allowed"], false);
    assert_eq!(body["delivered_text"], "Let's keep this friendly.");
    assert_eq!(body["used_provider"], "fallback");
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let (status, body) = send(moderate_request(r#"{"text": "   "}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn status_reports_chain_and_skipped_providers() {
    let (status, body) = send(Request::get("/api/status").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scorer"], "keyword");
    assert_eq!(body["threshold"], 0.5);
    assert_eq!(body["chain"], serde_json::json!(["keyword"]));
    assert_eq!(body["fallback_phrase"], "Let's keep this friendly.");
    assert_eq!(body["participants"]["senders"], 0);
}
