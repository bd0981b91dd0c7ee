pub mod actions;
pub mod calendar;
pub mod leads;
pub mod notes;

use std::sync::{Arc, MutexGuard};

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::errors::AppError;
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/notes/analyze", post(notes::analyze))
        .route("/api/leads", get(leads::search).post(leads::create))
        .route("/api/leads/:id", get(leads::get_lead))
        .route("/api/leads/:id/stage", post(leads::update_stage))
        .route("/api/leads/:id/notes", post(leads::update_notes))
        .route("/api/leads/:id/suggestions", get(leads::suggestions))
        .route(
            "/api/leads/:id/actions",
            get(actions::list_for_lead).post(actions::create),
        )
        .route("/api/actions/upcoming", get(actions::upcoming))
        .route("/api/actions/:id/complete", post(actions::complete))
        .route("/calendar/:action_id", get(calendar::download_ics))
        .with_state(state)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

pub(crate) fn lock_db(state: &AppState) -> Result<MutexGuard<'_, Connection>, AppError> {
    state
        .db
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
}

/// Wall-clock time in the server's local zone; notes speak in local dates.
pub(crate) fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
