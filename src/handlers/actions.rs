use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{check_auth, local_now, lock_db};
use crate::models::{Action, ActionType};
use crate::services::format::format_schedule;
use crate::state::AppState;

const DEFAULT_UPCOMING_LIMIT: i64 = 50;

#[derive(Serialize)]
pub struct ActionView {
    #[serde(flatten)]
    pub action: Action,
    pub label: String,
}

impl From<Action> for ActionView {
    fn from(action: Action) -> Self {
        Self {
            label: format_schedule(action.action_type, &action.scheduled_date),
            action,
        }
    }
}

// GET /api/leads/:id/actions
pub async fn list_for_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
) -> Result<Json<Vec<ActionView>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let db = lock_db(&state)?;
    if queries::get_lead_by_id(&db, &lead_id)?.is_none() {
        return Err(AppError::NotFound(format!("lead {lead_id}")));
    }
    let actions = queries::get_actions_for_lead(&db, &lead_id)?;
    Ok(Json(actions.into_iter().map(ActionView::from).collect()))
}

// POST /api/leads/:id/actions
//
// Accepting a suggestion posts its action_type/scheduled_date/notes here.
#[derive(Deserialize)]
pub struct CreateActionRequest {
    #[serde(default)]
    pub action_type: ActionType,
    pub scheduled_date: NaiveDateTime,
    pub notes: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(lead_id): Path<String>,
    Json(req): Json<CreateActionRequest>,
) -> Result<(StatusCode, Json<ActionView>), AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let action = Action {
        id: uuid::Uuid::new_v4().to_string(),
        lead_id,
        action_type: req.action_type,
        scheduled_date: req.scheduled_date,
        completed_date: None,
        notes: req.notes.filter(|n| !n.trim().is_empty()),
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = lock_db(&state)?;
        if queries::get_lead_by_id(&db, &action.lead_id)?.is_none() {
            return Err(AppError::NotFound(format!("lead {}", action.lead_id)));
        }
        queries::create_action(&db, &action)?;
    }

    tracing::info!(
        action_id = %action.id,
        lead_id = %action.lead_id,
        action_type = %action.action_type,
        scheduled = %action.scheduled_date,
        "action scheduled"
    );
    Ok((StatusCode::CREATED, Json(ActionView::from(action))))
}

// POST /api/actions/:id/complete
pub async fn complete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ActionView>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let db = lock_db(&state)?;
    let Some(action) = queries::get_action_by_id(&db, &id)? else {
        return Err(AppError::NotFound(format!("action {id}")));
    };
    if action.is_completed() {
        return Err(AppError::Conflict(format!("action {id} already completed")));
    }

    if !queries::complete_action(&db, &id, &Utc::now().naive_utc())? {
        return Err(AppError::Conflict(format!("action {id} already completed")));
    }
    tracing::info!(action_id = %id, "action completed");

    let action = queries::get_action_by_id(&db, &id)?;
    action
        .map(|a| Json(ActionView::from(a)))
        .ok_or_else(|| AppError::NotFound(format!("action {id}")))
}

// GET /api/actions/upcoming
#[derive(Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<i64>,
}

pub async fn upcoming(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<Vec<ActionView>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let limit = query.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT).clamp(1, 500);
    // scheduled_date is local wall time, so the cutoff is too
    let today = local_now().date().and_time(chrono::NaiveTime::MIN);

    let db = lock_db(&state)?;
    let actions = queries::get_upcoming_actions(&db, &today, limit)?;
    Ok(Json(actions.into_iter().map(ActionView::from).collect()))
}
