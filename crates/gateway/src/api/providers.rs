//! Provider endpoints: listing, verification, and cached model lists.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::state::AppState;

use super::api_error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/chat/providers/list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list(State(state): State<AppState>) -> Response {
    Json(serde_json::json!({
        "ok": true,
        "providers": state.engine.provider_names(),
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/chat/providers/verify
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct VerifyBody {
    #[serde(default)]
    provider: String,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Response {
    match state
        .engine
        .verify_provider(&body.provider, body.timeout_seconds)
        .await
    {
        Ok(result) => Json(serde_json::json!({ "ok": true, "result": result })).into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/chat/providers/models
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct ModelsQuery {
    #[serde(default)]
    provider: String,
    #[serde(default)]
    limit: usize,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default)]
    cache_ttl_seconds: i64,
    #[serde(default)]
    no_cache: bool,
}

pub async fn models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Response {
    match state
        .engine
        .list_models(
            &query.provider,
            query.limit,
            query.timeout_seconds,
            query.cache_ttl_seconds,
            query.no_cache,
        )
        .await
    {
        Ok(result) => Json(serde_json::json!({ "ok": true, "result": result })).into_response(),
        Err(e) => api_error(&e),
    }
}
