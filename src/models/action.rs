use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActionType {
    #[default]
    Call,
    Visites,
    Propositions,
    Estimation,
    #[serde(rename = "Follow up")]
    FollowUp,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Call => "Call",
            ActionType::Visites => "Visites",
            ActionType::Propositions => "Propositions",
            ActionType::Estimation => "Estimation",
            ActionType::FollowUp => "Follow up",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Visites" => ActionType::Visites,
            "Propositions" => ActionType::Propositions,
            "Estimation" => ActionType::Estimation,
            "Follow up" => ActionType::FollowUp,
            _ => ActionType::Call,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate action inferred from note text. Never persisted as-is;
/// accepting it creates an [`Action`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionSuggestion {
    pub action_type: ActionType,
    pub scheduled_date: NaiveDateTime,
    pub notes: String,
    pub confidence: u8,
    pub matched_text: String,
}

/// `scheduled_date` is local wall time, as typed in the notes.
/// `completed_date` and `created_at` are UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub lead_id: String,
    pub action_type: ActionType,
    pub scheduled_date: NaiveDateTime,
    pub completed_date: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Action {
    pub fn is_completed(&self) -> bool {
        self.completed_date.is_some()
    }
}
