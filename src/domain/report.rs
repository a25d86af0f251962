use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::error::AppError;
use super::table::GeneratedTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Complete,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Complete => "complete",
            ReportStatus::Failed => "failed",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ReportStatus::Draft)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReportStatus::Draft),
            "complete" => Ok(ReportStatus::Complete),
            "failed" => Ok(ReportStatus::Failed),
            other => Err(AppError::Internal(format!("Unknown report status: {}", other))),
        }
    }
}

/// What the user picked when requesting a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReportSelection {
    #[validate(length(min = 1, max = 64))]
    pub country_code: String,
    #[validate(length(min = 1, max = 64))]
    pub regulation_code: String,
    #[validate(length(max = 4096))]
    pub user_input: String,
}

impl ReportSelection {
    pub fn new(
        country_code: impl Into<String>,
        regulation_code: impl Into<String>,
        user_input: impl Into<String>,
    ) -> Self {
        Self {
            country_code: country_code.into().trim().to_string(),
            regulation_code: regulation_code.into().trim().to_string(),
            user_input: user_input.into(),
        }
    }
}

/// Everything recorded when a draft is opened.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub selection: ReportSelection,
    pub template_name: String,
    pub prompt_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub selection: ReportSelection,
    pub template_name: String,
    pub prompt_text: String,
    pub status: ReportStatus,
    pub table: Option<GeneratedTable>,
    pub failure_reason: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub country_code: String,
    pub regulation_code: String,
    pub template_name: String,
    pub status: ReportStatus,
    pub row_count: Option<usize>,
}

/// Newest-first listing.
#[derive(Debug, Clone, Serialize)]
pub struct ReportListing {
    pub reports: Vec<ReportSummary>,
}

impl ReportListing {
    /// True while any report is still waiting on generation.
    pub fn has_pending(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.status == ReportStatus::Draft)
    }
}
