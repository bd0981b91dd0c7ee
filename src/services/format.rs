use chrono::{Datelike, NaiveDateTime};

use crate::models::{ActionSuggestion, ActionType};
use crate::services::notes::MONTHS_FR;

/// `05 août 2025`
pub fn format_date_fr(dt: &NaiveDateTime) -> String {
    format!("{:02} {} {}", dt.day(), MONTHS_FR[dt.month0() as usize], dt.year())
}

/// `Visites le 05 août 2025 à 14:00`
pub fn format_schedule(action_type: ActionType, dt: &NaiveDateTime) -> String {
    format!(
        "{action_type} le {} à {}",
        format_date_fr(dt),
        dt.format("%H:%M")
    )
}

pub fn format_suggestion(suggestion: &ActionSuggestion) -> String {
    format_schedule(suggestion.action_type, &suggestion.scheduled_date)
}
