use std::sync::Arc;

use tracing::info;

use crate::application::{
    ConfigImporter, ExportReportUseCase, Exporter, GenerateReportUseCase, GenerationClient,
    MasterCatalog, PreviewPromptUseCase,
};
use crate::domain::error::Result;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::config_source::{ConfigSource, CsvDirectorySource, XlsxConfigSource};
use crate::infrastructure::db::{Database, MasterRepository, ReportStore};
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};

/// Every component of the pipeline, wired from one `AppConfig`.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub importer: ConfigImporter,
    pub catalog: Arc<MasterCatalog>,
    pub preview: Arc<PreviewPromptUseCase>,
    pub generate: GenerateReportUseCase,
    pub export: ExportReportUseCase,
    pub reports: Arc<ReportStore>,
}

impl AppState {
    /// Resolves the API key and talks to the configured provider.
    pub async fn bootstrap(mut config: AppConfig) -> Result<Self> {
        ConfigService::new().resolve_api_key(&mut config.llm);
        Self::with_llm_client(config, Arc::new(RouterClient::new())).await
    }

    pub async fn with_llm_client(config: AppConfig, llm_client: Arc<dyn LLMClient>) -> Result<Self> {
        config.check()?;
        let db = Database::connect(&config.database).await?;

        let master_repository = Arc::new(MasterRepository::new(&db));
        let reports = Arc::new(ReportStore::new(&db));

        let importer = ConfigImporter::new(master_repository.clone())
            .with_source(config_source(&config));
        let catalog = Arc::new(MasterCatalog::new(master_repository));
        let preview = Arc::new(PreviewPromptUseCase::new(
            catalog.clone(),
            config.report.default_columns.clone(),
        ));
        let generation = Arc::new(GenerationClient::new(llm_client, config.llm.clone()));
        let generate = GenerateReportUseCase::new(preview.clone(), generation, reports.clone());
        let export = ExportReportUseCase::new(
            reports.clone(),
            Exporter::new(config.report.sheet_name.clone()),
        );

        info!(
            database = %config.database.path.display(),
            provider = ?config.llm.provider,
            model = %config.llm.model,
            "Application ready"
        );

        Ok(Self {
            config,
            db,
            importer,
            catalog,
            preview,
            generate,
            export,
            reports,
        })
    }

    pub async fn shutdown(&self) {
        self.db.close().await;
    }
}

/// The workbook wins when both a workbook and a directory are configured.
fn config_source(config: &AppConfig) -> Arc<dyn ConfigSource> {
    match &config.import.workbook {
        Some(path) => Arc::new(XlsxConfigSource::new(path)),
        None => Arc::new(CsvDirectorySource::new(&config.import.config_dir)),
    }
}
