//! Free-text lead lookup.
//!
//! Every whitespace-separated term of the query has to hit at least one
//! field of a lead. Hits on the name weigh more than hits on contact
//! details, which weigh more than hits on city or notes.

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::Lead;

const NAME_EXACT: u32 = 100;
const NAME_PREFIX: u32 = 80;
const NAME_WORD_PREFIX: u32 = 60;
const NAME_CONTAINS: u32 = 40;
const EMAIL_CONTAINS: u32 = 30;
const PHONE_CONTAINS: u32 = 30;
const CITY_CONTAINS: u32 = 20;
const NOTES_CONTAINS: u32 = 10;

const MIN_PHONE_DIGITS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredLead {
    pub lead: Lead,
    pub score: u32,
}

pub fn search_leads(leads: &[Lead], query: &str) -> Vec<ScoredLead> {
    let query = fold(query);
    let terms: Vec<&str> = query.split_whitespace().collect();

    if terms.is_empty() {
        return leads
            .iter()
            .map(|lead| ScoredLead {
                lead: lead.clone(),
                score: 0,
            })
            .collect();
    }

    let mut results: Vec<ScoredLead> = leads
        .iter()
        .filter_map(|lead| {
            let fields = FoldedLead::new(lead);
            terms
                .iter()
                .map(|term| fields.score_term(term))
                .try_fold(0, |total, score| score.map(|s| total + s))
                .map(|score| ScoredLead {
                    lead: lead.clone(),
                    score,
                })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| fold(&a.lead.name).cmp(&fold(&b.lead.name)))
    });

    tracing::debug!(terms = terms.len(), hits = results.len(), "lead search");
    results
}

/// Lowercase, trimmed, accents stripped.
pub fn fold(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

struct FoldedLead {
    name: String,
    email: String,
    phone: String,
    city: String,
    notes: String,
}

impl FoldedLead {
    fn new(lead: &Lead) -> Self {
        Self {
            name: fold(&lead.name),
            email: lead.email.as_deref().map(fold).unwrap_or_default(),
            phone: lead.phone.as_deref().map(digits).unwrap_or_default(),
            city: lead.city.as_deref().map(fold).unwrap_or_default(),
            notes: lead.notes.as_deref().map(fold).unwrap_or_default(),
        }
    }

    /// Best field score for one term, `None` when nothing matches.
    fn score_term(&self, term: &str) -> Option<u32> {
        let term_digits = digits(term);
        let candidates = [
            (self.name == term, NAME_EXACT),
            (self.name.starts_with(term), NAME_PREFIX),
            (
                self.name.split_whitespace().any(|w| w.starts_with(term)),
                NAME_WORD_PREFIX,
            ),
            (self.name.contains(term), NAME_CONTAINS),
            (self.email.contains(term), EMAIL_CONTAINS),
            (
                term_digits.len() >= MIN_PHONE_DIGITS && self.phone.contains(&term_digits),
                PHONE_CONTAINS,
            ),
            (self.city.contains(term), CITY_CONTAINS),
            (self.notes.contains(term), NOTES_CONTAINS),
        ];
        candidates
            .iter()
            .filter(|(hit, _)| *hit)
            .map(|(_, score)| *score)
            .max()
    }
}
