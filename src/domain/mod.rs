pub mod error;
pub mod llm_config;
pub mod master;
pub mod prompt;
pub mod report;
pub mod table;

pub use error::{AppError, Result};
pub use master::{
    ImportCategory, ImportResult, MasterOption, OptionCategory, OptionGroup, RawRow, RejectedRow,
    SourceRow, UpsertOutcome,
};
pub use prompt::{PromptTemplate, TemplateKey};
pub use report::{NewReport, Report, ReportListing, ReportSelection, ReportStatus, ReportSummary};
pub use table::GeneratedTable;
