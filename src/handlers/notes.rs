use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::{check_auth, local_now};
use crate::models::ActionSuggestion;
use crate::services::format::format_suggestion;
use crate::services::notes::analyze_note_text;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionView {
    #[serde(flatten)]
    pub suggestion: ActionSuggestion,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestionView>,
}

impl SuggestionsResponse {
    pub fn analyze(text: &str, now: NaiveDateTime) -> Self {
        let suggestions = analyze_note_text(text, now)
            .into_iter()
            .map(|suggestion| SuggestionView {
                label: format_suggestion(&suggestion),
                suggestion,
            })
            .collect();
        Self { suggestions }
    }
}

// POST /api/notes/analyze
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    pub now: Option<NaiveDateTime>,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    check_auth(&headers, &state.config.api_token)?;

    let now = req.now.unwrap_or_else(local_now);
    Ok(Json(SuggestionsResponse::analyze(&req.text, now)))
}
