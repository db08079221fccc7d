//! Job inspection endpoints.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::state::AppState;

use super::api_error;

#[derive(Deserialize)]
pub struct JobQuery {
    #[serde(default)]
    job_id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/chat/jobs/status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> Response {
    match state.engine.job_status(&query.job_id) {
        Ok(job) => Json(serde_json::json!({ "ok": true, "job": job })).into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/chat/jobs/tail — text/plain
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct TailQuery {
    #[serde(default)]
    job_id: String,
    #[serde(default)]
    limit: usize,
}

pub async fn tail(
    State(state): State<AppState>,
    Query(query): Query<TailQuery>,
) -> Response {
    match state.engine.job_tail(&query.job_id, query.limit) {
        Ok(text) => (
            [(axum::http::header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(e) => api_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/chat/jobs/cancel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn cancel(
    State(state): State<AppState>,
    Json(body): Json<JobQuery>,
) -> Response {
    match state.engine.cancel_job(&body.job_id) {
        Ok(job) => Json(serde_json::json!({ "ok": true, "job": job })).into_response(),
        Err(e) => api_error(&e),
    }
}
