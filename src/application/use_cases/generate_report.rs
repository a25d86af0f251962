use super::generation::GenerationClient;
use super::preview_prompt::{PreviewPromptUseCase, PromptPreview};
use super::response_parser::ResponseParser;
use crate::domain::error::{AppError, Result};
use crate::domain::report::{NewReport, Report, ReportSelection};
use crate::domain::table::GeneratedTable;
use crate::infrastructure::db::ReportStore;
use crate::infrastructure::response::normalize_generation_output;
use std::sync::Arc;
use tracing::{error, info};

/// Selection -> prompt -> draft -> generation -> parse -> complete.
///
/// Failures before the draft exists are returned as-is and nothing is stored.
/// Once the draft exists, any failure (including a failed completion write)
/// marks it `failed` with the reason and comes back as
/// [`AppError::ReportFailed`] carrying the report id.
pub struct GenerateReportUseCase {
    preview: Arc<PreviewPromptUseCase>,
    generation: Arc<GenerationClient>,
    store: Arc<ReportStore>,
}

impl GenerateReportUseCase {
    pub fn new(
        preview: Arc<PreviewPromptUseCase>,
        generation: Arc<GenerationClient>,
        store: Arc<ReportStore>,
    ) -> Self {
        Self {
            preview,
            generation,
            store,
        }
    }

    pub async fn execute(&self, selection: ReportSelection) -> Result<Report> {
        let plan = self.preview.execute(&selection).await?;

        let draft = self
            .store
            .create(&NewReport {
                selection,
                template_name: plan.template_name.clone(),
                prompt_text: plan.prompt_text.clone(),
            })
            .await?;

        let outcome = match self.produce_table(&plan).await {
            Ok(table) => self.store.complete(&draft.id, &table).await,
            Err(cause) => Err(cause),
        };

        match outcome {
            Ok(report) => Ok(report),
            Err(cause) => Err(self.fail(draft.id, cause).await),
        }
    }

    /// Records the failure on the draft so it never stays pending.
    async fn fail(&self, report_id: String, cause: AppError) -> AppError {
        if let Err(store_err) = self.store.mark_failed(&report_id, &cause.to_string()).await {
            error!(report_id = %report_id, error = %store_err, "Could not record report failure");
        }
        AppError::ReportFailed {
            report_id,
            cause: Box::new(cause),
        }
    }

    /// The only await on the backend; no store handle is held across it.
    async fn produce_table(&self, plan: &PromptPreview) -> Result<GeneratedTable> {
        let raw = self.generation.generate(&plan.prompt_text).await?;
        let cleaned = normalize_generation_output(&raw);
        let table = ResponseParser::parse(&cleaned, &plan.columns)?;
        info!(rows = table.row_count(), "Generation output parsed");
        Ok(table)
    }
}
