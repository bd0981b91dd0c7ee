pub mod calendar;
pub mod format;
pub mod lead_search;
pub mod notes;
