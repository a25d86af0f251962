use super::exporter::{ExportFormat, Exporter};
use crate::domain::error::Result;
use crate::infrastructure::db::ReportStore;
use std::sync::Arc;
use tracing::info;

/// A download-ready export.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct ExportReportUseCase {
    store: Arc<ReportStore>,
    exporter: Exporter,
}

impl ExportReportUseCase {
    pub fn new(store: Arc<ReportStore>, exporter: Exporter) -> Self {
        Self { store, exporter }
    }

    pub async fn execute(&self, report_id: &str, format: ExportFormat) -> Result<ExportedFile> {
        let report = self.store.get(report_id).await?;
        let bytes = self.exporter.export(&report, format)?;

        info!(report_id, format = %format, bytes = bytes.len(), "Report exported");
        Ok(ExportedFile {
            file_name: format!("report_{}.{}", report.id, format.extension()),
            mime_type: format.mime_type(),
            bytes,
        })
    }
}
