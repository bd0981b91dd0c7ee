pub mod action;
pub mod lead;

pub use action::{Action, ActionSuggestion, ActionType};
pub use lead::{Lead, PipelineStage};
