use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Action, ActionType, Lead, PipelineStage};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Leads ──

const LEAD_COLUMNS: &str =
    "id, name, email, phone, city, stage, notes, created_at, updated_at";

pub fn create_lead(conn: &Connection, lead: &Lead) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO leads (id, name, email, phone, city, stage, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            lead.id,
            lead.name,
            lead.email,
            lead.phone,
            lead.city,
            lead.stage.as_str(),
            lead.notes,
            ts(&lead.created_at),
            ts(&lead.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_lead_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Lead>> {
    let lead = conn
        .query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            params![id],
            parse_lead_row,
        )
        .optional()?;
    Ok(lead)
}

pub fn list_leads(conn: &Connection) -> anyhow::Result<Vec<Lead>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads ORDER BY updated_at DESC"
    ))?;
    let rows = stmt.query_map([], parse_lead_row)?;

    let mut leads = vec![];
    for row in rows {
        leads.push(row?);
    }
    Ok(leads)
}

pub fn update_lead_stage(
    conn: &Connection,
    id: &str,
    stage: PipelineStage,
) -> anyhow::Result<bool> {
    let now = ts(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE leads SET stage = ?1, updated_at = ?2 WHERE id = ?3",
        params![stage.as_str(), now, id],
    )?;
    Ok(count > 0)
}

pub fn update_lead_notes(conn: &Connection, id: &str, notes: &str) -> anyhow::Result<bool> {
    let now = ts(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE leads SET notes = ?1, updated_at = ?2 WHERE id = ?3",
        params![notes, now, id],
    )?;
    Ok(count > 0)
}

fn parse_lead_row(row: &rusqlite::Row) -> rusqlite::Result<Lead> {
    let stage: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        city: row.get(4)?,
        stage: PipelineStage::parse(&stage),
        notes: row.get(6)?,
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    })
}

// ── Actions ──

const ACTION_COLUMNS: &str =
    "id, lead_id, action_type, scheduled_date, completed_date, notes, created_at";

pub fn create_action(conn: &Connection, action: &Action) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO actions (id, lead_id, action_type, scheduled_date, completed_date, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            action.id,
            action.lead_id,
            action.action_type.as_str(),
            ts(&action.scheduled_date),
            action.completed_date.as_ref().map(ts),
            action.notes,
            ts(&action.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_action_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Action>> {
    let action = conn
        .query_row(
            &format!("SELECT {ACTION_COLUMNS} FROM actions WHERE id = ?1"),
            params![id],
            parse_action_row,
        )
        .optional()?;
    Ok(action)
}

pub fn get_actions_for_lead(conn: &Connection, lead_id: &str) -> anyhow::Result<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTION_COLUMNS} FROM actions WHERE lead_id = ?1 ORDER BY scheduled_date ASC"
    ))?;
    let rows = stmt.query_map(params![lead_id], parse_action_row)?;

    let mut actions = vec![];
    for row in rows {
        actions.push(row?);
    }
    Ok(actions)
}

/// Open actions scheduled at or after `from`, soonest first.
pub fn get_upcoming_actions(
    conn: &Connection,
    from: &NaiveDateTime,
    limit: i64,
) -> anyhow::Result<Vec<Action>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACTION_COLUMNS} FROM actions
         WHERE completed_date IS NULL AND scheduled_date >= ?1
         ORDER BY scheduled_date ASC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![ts(from), limit], parse_action_row)?;

    let mut actions = vec![];
    for row in rows {
        actions.push(row?);
    }
    Ok(actions)
}

/// Stamp `completed_date` on an open action. Returns false when the action
/// does not exist or was already completed.
pub fn complete_action(
    conn: &Connection,
    id: &str,
    completed_at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE actions SET completed_date = ?1 WHERE id = ?2 AND completed_date IS NULL",
        params![ts(completed_at), id],
    )?;
    Ok(count > 0)
}

fn parse_action_row(row: &rusqlite::Row) -> rusqlite::Result<Action> {
    let action_type: String = row.get(2)?;
    let scheduled_date: String = row.get(3)?;
    let completed_date: Option<String> = row.get(4)?;
    let created_at: String = row.get(6)?;

    Ok(Action {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        action_type: ActionType::parse(&action_type),
        scheduled_date: parse_ts(&scheduled_date),
        completed_date: completed_date.as_deref().map(parse_ts),
        notes: row.get(5)?,
        created_at: parse_ts(&created_at),
    })
}
