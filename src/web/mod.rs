// Web server: Axum front end for the moderation relay.
//
// POST /moderate is the request/response boundary to the pipeline.
// /ws/sender, /ws/receiver and /ws/moderator attach sockets to the
// conversation hub. Page serving is left to whatever hosts the UI.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::hub::ConversationHub;
use crate::moderation::ModerationPipeline;

pub mod handlers;
pub mod ws;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<ModerationPipeline>,
    pub hub: ConversationHub,
}

impl AppState {
    pub fn new(config: Arc<Config>, pipeline: Arc<ModerationPipeline>) -> Self {
        let hub = ConversationHub::new(Arc::clone(&pipeline));
        Self {
            config,
            pipeline,
            hub,
        }
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config) -> Result<()> {
    let pipeline = Arc::new(ModerationPipeline::from_config(&config)?);
    let addr = format!("{}:{}", config.bind, config.port);
    let state = AppState::new(Arc::new(config), pipeline);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Politely relay listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(handlers::status::get_status))
        .route("/moderate", post(handlers::moderate::moderate))
        .route("/ws/sender", get(ws::sender_socket))
        .route("/ws/receiver", get(ws::receiver_socket))
        .route("/ws/moderator", get(ws::moderator_socket))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check: always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
