use chrono::Duration;

use crate::models::Action;

const EVENT_MINUTES: i64 = 30;

pub fn generate_ics(action: &Action, lead_name: &str) -> String {
    let dtstart = action.scheduled_date.format("%Y%m%dT%H%M%S").to_string();
    let dtend = (action.scheduled_date + Duration::minutes(EVENT_MINUTES))
        .format("%Y%m%dT%H%M%S")
        .to_string();
    // created_at is UTC
    let dtstamp = action.created_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@notedesk", action.id);

    let summary = escape_text(&format!("{} - {}", action.action_type, lead_name));
    let description = action
        .notes
        .as_deref()
        .map(escape_text)
        .unwrap_or_else(|| "Aucune note".to_string());

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Notedesk//CRM Actions//FR\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

// RFC 5545 TEXT escaping. Any line break becomes a literal `\n` and other
// control characters are dropped, so a value can never start a new property.
fn escape_text(s: &str) -> String {
    s.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
