//! Action suggestions from free-form French notes.
//!
//! Three date recognizers run over the whole note (named month, numeric,
//! relative weekday). Each hit is classified by the action keywords found
//! around it, then the candidates are filtered, deduplicated and sorted.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Match, Regex};

use crate::models::{ActionSuggestion, ActionType};

pub const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Sunday is 0, matching `num_days_from_sunday`.
const WEEKDAYS_FR: [(&str, i64); 7] = [
    ("dimanche", 0),
    ("lundi", 1),
    ("mardi", 2),
    ("mercredi", 3),
    ("jeudi", 4),
    ("vendredi", 5),
    ("samedi", 6),
];

/// Characters inspected on each side of a date match.
const CONTEXT_RADIUS: usize = 50;

const MORNING: (u32, u32) = (10, 0);
const LATE_MORNING: (u32, u32) = (11, 30);
const AFTERNOON: (u32, u32) = (14, 0);
const EVENING: (u32, u32) = (18, 0);

static NAMED_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\ble\s+(\d{1,2})\s+(janvier|février|mars|avril|mai|juin|juillet|août|septembre|octobre|novembre|décembre)\b(?:\s+(\d{4}))?(?:\s+(?:en|à|vers)\s+(fin\s+de\s+)?(matinée|après-midi|soir))?",
    )
    .unwrap()
});

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d{4}|\d{2}))?\b").unwrap()
});

static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche)(?:\s+(prochain|suivant))?\b",
    )
    .unwrap()
});

/// Keyword groups, in evaluation order. Highest confidence wins; on a tie
/// the earlier entry is kept.
static KEYWORD_RULES: LazyLock<Vec<(ActionType, u8, Regex)>> = LazyLock::new(|| {
    vec![
        (
            ActionType::Call,
            90,
            Regex::new(r"(?i)appel|appeler|t[ée]l[ée]phoner|contacter").unwrap(),
        ),
        (
            ActionType::Call,
            90,
            Regex::new(r"(?i)rappel|rappeler").unwrap(),
        ),
        (
            ActionType::Call,
            80,
            Regex::new(r"(?i)entretien|r[ée]union").unwrap(),
        ),
        (
            ActionType::Call,
            75,
            Regex::new(r"(?i)rendez-vous|\brdv\b").unwrap(),
        ),
        (
            ActionType::Visites,
            85,
            Regex::new(r"(?i)visite|visiter").unwrap(),
        ),
        (
            ActionType::Propositions,
            80,
            Regex::new(r"(?i)propositions?").unwrap(),
        ),
        (
            ActionType::Estimation,
            85,
            Regex::new(r"(?i)estimation|estimer").unwrap(),
        ),
        (
            ActionType::FollowUp,
            85,
            Regex::new(r"(?i)suivi|suivre|follow-up").unwrap(),
        ),
    ]
});

#[derive(Debug)]
struct DateMatch {
    start: usize,
    end: usize,
    text: String,
    date: NaiveDateTime,
}

impl DateMatch {
    fn new(m: Match<'_>, date: NaiveDateTime) -> Self {
        Self {
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
            date,
        }
    }
}

/// Scan `text` for dates and propose one action per (date, type) pair.
///
/// `now` stands in for the clock: it supplies the default year, the base
/// for relative weekdays and the cutoff below which dates are dropped.
/// Never fails; unparseable or impossible dates are skipped.
pub fn analyze_note_text(text: &str, now: NaiveDateTime) -> Vec<ActionSuggestion> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let today = now.date().and_time(NaiveTime::MIN);

    let mut matches = named_month_matches(text, now);
    matches.extend(numeric_matches(text, now));
    matches.extend(weekday_matches(text, now));

    let found = matches.len();
    let mut seen = HashSet::new();
    let mut suggestions: Vec<ActionSuggestion> = matches
        .into_iter()
        .filter(|m| m.date >= today)
        .map(|m| {
            let (action_type, confidence) = classify(context_window(text, m.start, m.end));
            ActionSuggestion {
                action_type,
                scheduled_date: m.date,
                notes: format!("Suggéré depuis la note : « {} »", m.text),
                confidence,
                matched_text: m.text,
            }
        })
        .filter(|s| seen.insert((s.scheduled_date, s.action_type)))
        .collect();

    suggestions.sort_by_key(|s| s.scheduled_date);

    tracing::debug!(
        date_matches = found,
        suggestions = suggestions.len(),
        "analyzed note text"
    );

    suggestions
}

/// Best (action type, confidence) for a window of text. `Call` at 0 when
/// no keyword is present.
pub fn classify(window: &str) -> (ActionType, u8) {
    let mut best = (ActionType::Call, 0);
    for (action_type, confidence, pattern) in KEYWORD_RULES.iter() {
        if *confidence > best.1 && pattern.is_match(window) {
            best = (*action_type, *confidence);
        }
    }
    best
}

fn named_month_matches(text: &str, now: NaiveDateTime) -> Vec<DateMatch> {
    NAMED_MONTH_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let day: u32 = caps[1].parse().ok()?;
            let month = month_number(&caps[2])?;
            let year = caps
                .get(3)
                .and_then(|y| y.as_str().parse().ok())
                .unwrap_or(now.year());
            let time = time_slot(&caps);
            let date = calendar_date(year, month, day, whole.as_str())?;
            Some(DateMatch::new(whole, date.and_time(time)))
        })
        .collect()
}

fn numeric_matches(text: &str, now: NaiveDateTime) -> Vec<DateMatch> {
    NUMERIC_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let day: u32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            let year = match caps.get(3) {
                Some(y) if y.as_str().len() == 2 => 2000 + y.as_str().parse::<i32>().ok()?,
                Some(y) => y.as_str().parse().ok()?,
                None => now.year(),
            };
            let date = calendar_date(year, month, day, whole.as_str())?;
            Some(DateMatch::new(whole, date.and_time(NaiveTime::MIN)))
        })
        .collect()
}

fn weekday_matches(text: &str, now: NaiveDateTime) -> Vec<DateMatch> {
    let current = now.weekday().num_days_from_sunday() as i64;

    WEEKDAY_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let target = weekday_number(&caps[1])?;
            let mut days = target - current;
            if days <= 0 || caps.get(2).is_some() {
                days += 7;
            }
            let date = now.date() + Duration::days(days);
            Some(DateMatch::new(whole, date.and_time(hm(MORNING))))
        })
        .collect()
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS_FR
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}

fn weekday_number(name: &str) -> Option<i64> {
    let name = name.to_lowercase();
    WEEKDAYS_FR
        .iter()
        .find(|(day, _)| *day == name)
        .map(|(_, n)| *n)
}

fn time_slot(caps: &Captures<'_>) -> NaiveTime {
    let Some(slot) = caps.get(5) else {
        return NaiveTime::MIN;
    };
    let late = caps.get(4).is_some();
    match slot.as_str().to_lowercase().as_str() {
        "matinée" if late => hm(LATE_MORNING),
        "matinée" => hm(MORNING),
        "après-midi" => hm(AFTERNOON),
        "soir" => hm(EVENING),
        _ => NaiveTime::MIN,
    }
}

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn calendar_date(year: i32, month: u32, day: u32, source: &str) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        tracing::trace!(source, year, month, day, "skipping impossible date");
    }
    date
}

/// Slice of `text` reaching `CONTEXT_RADIUS` characters either side of
/// `start..end`, clamped to the text.
fn context_window(text: &str, start: usize, end: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    &text[from..to]
}
