use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::trigger::ReconcileTrigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassOutcome {
    Skipped,
    Success,
    Failed,
}

impl PassOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassOutcome::Skipped => "skipped",
            PassOutcome::Success => "success",
            PassOutcome::Failed => "failed",
        }
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReportDto {
    pub trigger: Option<ReconcileTrigger>,
    pub outcome: PassOutcome,
    pub code: Option<String>,
    pub message: Option<String>,
    pub entries: usize,
    pub skipped_services: usize,
    pub elapsed_ms: u128,
    pub finished_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct BasicOutcomeDto {
    pub status: OutcomeStatus,
}

impl BasicOutcomeDto {
    pub fn ok() -> Self {
        Self {
            status: OutcomeStatus::Ok,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all="SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Ok,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorDto {
    pub code: String,
    pub message: String,
}
