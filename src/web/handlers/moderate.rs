// POST /moderate: one-shot moderation of a single text.
//
// Request:  {"text": "..."}
// Response: the Decision fields plus `allowed` (= !is_toxic).
// Returns 400 if the text is blank.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct ModerateRequest {
    pub text: String,
}

pub async fn moderate(
    State(state): State<AppState>,
    Json(request): Json<ModerateRequest>,
) -> impl IntoResponse {
    if request.text.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "text must not be empty");
    }

    let decision = state.pipeline.moderate(&request.text).await;

    let mut body = serde_json::to_value(&decision).unwrap_or_default();
    if let Some(object) = body.as_object_mut() {
        object.insert("allowed".to_string(), (!decision.is_toxic).into());
    }
    Json(body).into_response()
}
