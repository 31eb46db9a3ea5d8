// GET /api/status: configuration summary and live participant counts.
//
// Lists every configured provider (usable or not) so an operator can see
// why a provider is being skipped without reading the logs.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::web::AppState;

pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let counts = state.hub.counts().await;
    let chain = state.pipeline.chain();

    let providers: Vec<serde_json::Value> = state
        .config
        .providers
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "enabled": p.enabled,
                "usable": p.is_usable(),
                "missing": p.missing(),
                "timeout_ms": p.timeout.as_millis() as u64,
            })
        })
        .collect();

    Json(serde_json::json!({
        "threshold": state.pipeline.threshold(),
        "scorer": state.pipeline.scorer_name(),
        "scorer_timeout_ms": state.pipeline.scorer_timeout().as_millis() as u64,
        "providers": providers,
        "chain": chain.provider_ids(),
        "fallback_phrase": chain.fallback_phrase(),
        "worst_case_rephrase_ms": chain.worst_case_latency().as_millis() as u64,
        "participants": counts,
    }))
}
