//! HTTP surface — a thin wrapper over the engine.
//!
//! Success responses carry `{"ok": true, ...}`; failures are
//! `{"ok": false, "error": ...}` with a status code per error category.

pub mod chat;
pub mod jobs;
pub mod providers;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use mc_domain::{now_rfc3339, Error};

use crate::state::AppState;

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Runs
        .route("/api/chat/new", post(chat::new_run))
        .route("/api/chat/list", get(chat::list_runs))
        .route("/api/chat/get", get(chat::get_run))
        // Settings
        .route("/api/chat/config", get(chat::config_get).post(chat::config_set))
        .route(
            "/api/chat/run/settings",
            get(chat::get_run_settings).post(chat::set_run_settings),
        )
        // Async turns
        .route("/api/chat/run_async", post(chat::run_async))
        .route("/api/chat/jobs/status", get(jobs::status))
        .route("/api/chat/jobs/tail", get(jobs::tail))
        .route("/api/chat/jobs/cancel", post(jobs::cancel))
        // Providers
        .route("/api/chat/providers/list", get(providers::list))
        .route("/api/chat/providers/verify", post(providers::verify))
        .route("/api/chat/providers/models", get(providers::models))
        // Health probe
        .route("/health", get(health))
        .with_state(state)
}

/// Map a domain error onto a JSON error response.
pub(crate) fn api_error(e: &Error) -> Response {
    let status = match e {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Policy(_) => StatusCode::FORBIDDEN,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
    )
        .into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let policy = state.engine.policy();
    Json(serde_json::json!({
        "ok": true,
        "time": now_rfc3339(),
        "net_enabled": policy.net_enabled,
        "allow_domains": policy.allow_domains,
    }))
}
