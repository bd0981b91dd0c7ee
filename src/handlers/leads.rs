use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::notes::SuggestionsResponse;
use crate::handlers::{check_auth, local_now, lock_db};
use crate::models::{Lead, PipelineStage};
use crate::services::lead_search::{search_leads, ScoredLead};
use crate::state::AppState;

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("lead {id}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// GET /api/leads?q=
#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ScoredLead>>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let leads = {
        let db = lock_db(&state)?;
        queries::list_leads(&db)?
    };
    Ok(Json(search_leads(&leads, query.q.as_deref().unwrap_or(""))))
}

// POST /api/leads
#[derive(Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub notes: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<Lead>), AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    for (field, value) in [
        ("name", Some(name)),
        ("email", req.email.as_deref()),
        ("phone", req.phone.as_deref()),
        ("city", req.city.as_deref()),
    ] {
        if value.is_some_and(|v| v.chars().any(char::is_control)) {
            return Err(AppError::BadRequest(format!(
                "{field} must not contain control characters"
            )));
        }
    }

    let now = Utc::now().naive_utc();
    let lead = Lead {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: non_empty(req.email),
        phone: non_empty(req.phone),
        city: non_empty(req.city),
        stage: PipelineStage::New,
        notes: non_empty(req.notes),
        created_at: now,
        updated_at: now,
    };

    {
        let db = lock_db(&state)?;
        queries::create_lead(&db, &lead)?;
    }

    tracing::info!(lead_id = %lead.id, "lead created");
    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/leads/:id
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Lead>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let db = lock_db(&state)?;
    let lead = queries::get_lead_by_id(&db, &id)?;
    lead.map(Json).ok_or_else(|| not_found(&id))
}

// POST /api/leads/:id/stage
#[derive(Deserialize)]
pub struct StageRequest {
    pub stage: PipelineStage,
}

pub async fn update_stage(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<StageRequest>,
) -> Result<Json<Lead>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let db = lock_db(&state)?;
    if !queries::update_lead_stage(&db, &id, req.stage)? {
        return Err(not_found(&id));
    }
    tracing::info!(lead_id = %id, stage = req.stage.as_str(), "lead stage changed");

    let lead = queries::get_lead_by_id(&db, &id)?;
    lead.map(Json).ok_or_else(|| not_found(&id))
}

// POST /api/leads/:id/notes
#[derive(Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Serialize)]
pub struct NotesResponse {
    pub lead: Lead,
    #[serde(flatten)]
    pub suggestions: SuggestionsResponse,
}

pub async fn update_notes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<NotesRequest>,
) -> Result<Json<NotesResponse>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let lead = {
        let db = lock_db(&state)?;
        if !queries::update_lead_notes(&db, &id, &req.notes)? {
            return Err(not_found(&id));
        }
        queries::get_lead_by_id(&db, &id)?.ok_or_else(|| not_found(&id))?
    };

    Ok(Json(NotesResponse {
        suggestions: SuggestionsResponse::analyze(&req.notes, local_now()),
        lead,
    }))
}

// GET /api/leads/:id/suggestions
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let lead = {
        let db = lock_db(&state)?;
        queries::get_lead_by_id(&db, &id)?.ok_or_else(|| not_found(&id))?
    };

    let notes = lead.notes.unwrap_or_default();
    Ok(Json(SuggestionsResponse::analyze(&notes, local_now())))
}
