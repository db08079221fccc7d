//! Run and settings endpoints.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use mc_domain::Settings;

use crate::runtime::NewRunRequest;
use crate::state::AppState;

use super::api_error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/chat/new
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn new_run(
    State(state): State<AppState>,
    Json(body): Json<NewRunRequest>,
) -> Response {
    match state.engine.new_run(body) {
        Ok(result) => Json(serde_json::json!({
            "ok": true,
            "run_name": result.run_name,
            "meta": result.meta,
        }))
        .into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/chat/list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    limit: usize,
}

pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.engine.list_runs(query.limit) {
        Ok(items) => Json(serde_json::json!({ "ok": true, "items": items })).into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/chat/get
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    run_name: String,
    #[serde(default)]
    tail: usize,
}

pub async fn get_run(
    State(state): State<AppState>,
    Query(query): Query<GetQuery>,
) -> Response {
    match state.engine.get_run(&query.run_name, query.tail) {
        Ok((meta, events)) => Json(serde_json::json!({
            "ok": true,
            "meta": meta,
            "events": events,
        }))
        .into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET / POST /api/chat/config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn config_get(State(state): State<AppState>) -> Response {
    match state.engine.config_get() {
        Ok((settings, found)) => Json(serde_json::json!({
            "ok": true,
            "settings": settings,
            "found": found,
        }))
        .into_response(),
        Err(e) => api_error(&e),
    }
}

pub async fn config_set(
    State(state): State<AppState>,
    Json(body): Json<Settings>,
) -> Response {
    match state.engine.config_set(body) {
        Ok(settings) => {
            Json(serde_json::json!({ "ok": true, "settings": settings })).into_response()
        }
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET / POST /api/chat/run/settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct RunSettingsQuery {
    #[serde(default)]
    run_name: String,
}

pub async fn get_run_settings(
    State(state): State<AppState>,
    Query(query): Query<RunSettingsQuery>,
) -> Response {
    match state.engine.get_run_settings(&query.run_name) {
        Ok(result) => Json(serde_json::json!({ "ok": true, "result": result })).into_response(),
        Err(e) => api_error(&e),
    }
}

#[derive(Deserialize)]
pub struct SetRunSettingsBody {
    #[serde(default)]
    run_name: String,
    settings: Settings,
}

pub async fn set_run_settings(
    State(state): State<AppState>,
    Json(body): Json<SetRunSettingsBody>,
) -> Response {
    match state.engine.set_run_settings(&body.run_name, body.settings) {
        Ok(_) => Json(serde_json::json!({
            "ok": true,
            "result": { "run_name": body.run_name, "ok": true },
        }))
        .into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/chat/run_async
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct RunAsyncBody {
    #[serde(default)]
    run_name: String,
    #[serde(default)]
    message: String,
}

pub async fn run_async(
    State(state): State<AppState>,
    Json(body): Json<RunAsyncBody>,
) -> Response {
    match state.engine.run_async(&body.run_name, &body.message) {
        Ok(result) => Json(serde_json::json!({
            "ok": true,
            "job_id": result.job_id,
            "run_name": result.run_name,
            "turn": result.turn,
        }))
        .into_response(),
        Err(e) => api_error(&e),
    }
}
