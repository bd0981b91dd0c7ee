use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;

use crate::db::queries;
use crate::handlers::lock_db;
use crate::models::Action;
use crate::services::calendar::generate_ics;
use crate::state::AppState;

pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Response {
    // Strip .ics suffix if present
    let action_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let loaded = match lock_db(&state) {
        Ok(db) => load_action(&db, action_id),
        Err(e) => Err(e.into()),
    };

    let (action, lead_name) = match loaded {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, "Action not found").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load action for .ics");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    let ics = generate_ics(&action, &lead_name);
    let disposition = format!("attachment; filename=\"action-{action_id}.ics\"");

    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, disposition.as_str()),
        ],
        ics,
    )
        .into_response()
}

fn load_action(conn: &Connection, id: &str) -> anyhow::Result<Option<(Action, String)>> {
    let Some(action) = queries::get_action_by_id(conn, id)? else {
        return Ok(None);
    };
    let lead_name = queries::get_lead_by_id(conn, &action.lead_id)?
        .map(|lead| lead.name)
        .unwrap_or_else(|| "Contact".to_string());
    Ok(Some((action, lead_name)))
}
