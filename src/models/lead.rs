use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// `created_at` and `updated_at` are UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub stage: PipelineStage,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::New => "new",
            PipelineStage::Contacted => "contacted",
            PipelineStage::Qualified => "qualified",
            PipelineStage::Proposal => "proposal",
            PipelineStage::Negotiation => "negotiation",
            PipelineStage::Won => "won",
            PipelineStage::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "contacted" => PipelineStage::Contacted,
            "qualified" => PipelineStage::Qualified,
            "proposal" => PipelineStage::Proposal,
            "negotiation" => PipelineStage::Negotiation,
            "won" => PipelineStage::Won,
            "lost" => PipelineStage::Lost,
            _ => PipelineStage::New,
        }
    }
}
