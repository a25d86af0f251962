use crate::domain::error::{AppError, Result};
use crate::domain::report::{
    NewReport, Report, ReportListing, ReportSelection, ReportStatus, ReportSummary,
};
use crate::domain::table::GeneratedTable;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use super::sqlite::{format_timestamp, parse_timestamp, Database};

/// Transaction table of generated reports.
///
/// A report is created as `draft` and finalised exactly once, either to
/// `complete` (table attached) or `failed` (reason attached). Finalisation is a
/// single conditional UPDATE, so status and payload change together.
pub struct ReportStore {
    pool: SqlitePool,
}

impl ReportStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn create(&self, new_report: &NewReport) -> Result<Report> {
        let id = Uuid::new_v4().simple().to_string();
        let created_at = chrono::Utc::now();
        let selection = &new_report.selection;

        sqlx::query(
            "INSERT INTO reports
                (id, created_at, country_code, regulation_code, user_input, template_name, prompt_text, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(format_timestamp(&created_at))
        .bind(&selection.country_code)
        .bind(&selection.regulation_code)
        .bind(&selection.user_input)
        .bind(&new_report.template_name)
        .bind(&new_report.prompt_text)
        .bind(ReportStatus::Draft.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create report: {}", e)))?;

        info!(report_id = %id, "Report draft created");
        self.get(&id).await
    }

    pub async fn complete(&self, report_id: &str, table: &GeneratedTable) -> Result<Report> {
        let table_json = serde_json::to_string(table)
            .map_err(|e| AppError::Internal(format!("Failed to encode table: {}", e)))?;

        self.finalize(
            report_id,
            ReportStatus::Complete,
            Some((table_json, table.row_count() as i64)),
            None,
        )
        .await?;
        info!(report_id, rows = table.row_count(), "Report completed");
        self.get(report_id).await
    }

    pub async fn mark_failed(&self, report_id: &str, reason: &str) -> Result<Report> {
        self.finalize(report_id, ReportStatus::Failed, None, Some(reason))
            .await?;
        warn!(report_id, reason, "Report failed");
        self.get(report_id).await
    }

    pub async fn get(&self, report_id: &str) -> Result<Report> {
        let report = sqlx::query_as::<_, ReportEntity>(
            "SELECT id, created_at, country_code, regulation_code, user_input, template_name,
                    prompt_text, status, table_json, failure_reason, finalized_at
             FROM reports WHERE id = ?",
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch report: {}", e)))?;

        match report {
            Some(report) => report.try_into(),
            None => Err(AppError::NotFound(format!("Report not found: {}", report_id))),
        }
    }

    /// All reports, newest first. Reads only the summary columns; stored
    /// tables are never decoded here.
    pub async fn list(&self) -> Result<ReportListing> {
        let rows = sqlx::query_as::<_, ReportSummaryEntity>(
            "SELECT id, created_at, country_code, regulation_code, template_name, status, row_count
             FROM reports ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list reports: {}", e)))?;

        let reports = rows
            .into_iter()
            .map(ReportSummary::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(ReportListing { reports })
    }

    async fn finalize(
        &self,
        report_id: &str,
        status: ReportStatus,
        table: Option<(String, i64)>,
        failure_reason: Option<&str>,
    ) -> Result<()> {
        let finalized_at = format_timestamp(&chrono::Utc::now());
        let (table_json, row_count) = table.unzip();
        let result = sqlx::query(
            "UPDATE reports
             SET status = ?, table_json = ?, row_count = ?, failure_reason = ?, finalized_at = ?
             WHERE id = ? AND status = 'draft'",
        )
        .bind(status.as_str())
        .bind(table_json)
        .bind(row_count)
        .bind(failure_reason)
        .bind(finalized_at)
        .bind(report_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to finalize report: {}", e)))?;

        if result.rows_affected() == 0 {
            let existing = self.get(report_id).await?;
            return Err(AppError::AlreadyFinalized(format!(
                "Report {} is already {}",
                report_id, existing.status
            )));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ReportEntity {
    id: String,
    created_at: String,
    country_code: String,
    regulation_code: String,
    user_input: String,
    template_name: String,
    prompt_text: String,
    status: String,
    table_json: Option<String>,
    failure_reason: Option<String>,
    finalized_at: Option<String>,
}

impl TryFrom<ReportEntity> for Report {
    type Error = AppError;

    fn try_from(entity: ReportEntity) -> Result<Self> {
        let table = entity
            .table_json
            .as_deref()
            .map(|json| {
                serde_json::from_str::<GeneratedTable>(json).map_err(|e| {
                    AppError::DatabaseError(format!("Invalid stored table for {}: {}", entity.id, e))
                })
            })
            .transpose()?;

        Ok(Self {
            created_at: parse_timestamp(&entity.created_at)?,
            finalized_at: entity
                .finalized_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            selection: ReportSelection {
                country_code: entity.country_code,
                regulation_code: entity.regulation_code,
                user_input: entity.user_input,
            },
            template_name: entity.template_name,
            prompt_text: entity.prompt_text,
            status: ReportStatus::from_str(&entity.status)?,
            table,
            failure_reason: entity.failure_reason,
            id: entity.id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReportSummaryEntity {
    id: String,
    created_at: String,
    country_code: String,
    regulation_code: String,
    template_name: String,
    status: String,
    row_count: Option<i64>,
}

impl TryFrom<ReportSummaryEntity> for ReportSummary {
    type Error = AppError;

    fn try_from(entity: ReportSummaryEntity) -> Result<Self> {
        Ok(Self {
            created_at: parse_timestamp(&entity.created_at)?,
            status: ReportStatus::from_str(&entity.status)?,
            row_count: entity.row_count.map(|n| n.max(0) as usize),
            id: entity.id,
            country_code: entity.country_code,
            regulation_code: entity.regulation_code,
            template_name: entity.template_name,
        })
    }
}
