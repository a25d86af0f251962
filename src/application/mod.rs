pub mod use_cases;

pub use use_cases::config_import::ConfigImporter;
pub use use_cases::export_report::{ExportReportUseCase, ExportedFile};
pub use use_cases::exporter::{ExportFormat, Exporter};
pub use use_cases::generate_report::GenerateReportUseCase;
pub use use_cases::generation::{GenerationClient, TABULAR_SYSTEM_PROMPT};
pub use use_cases::master_catalog::MasterCatalog;
pub use use_cases::preview_prompt::{PreviewPromptUseCase, PromptPreview};
pub use use_cases::prompt_builder::PromptBuilder;
pub use use_cases::response_parser::ResponseParser;
