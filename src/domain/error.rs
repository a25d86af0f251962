use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Missing variable: {0}")]
    MissingVariable(String),
    #[error("Unresolved placeholder: {0}")]
    UnresolvedPlaceholder(String),
    #[error("Generation backend unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("Generation timed out after {0}s")]
    GenerationTimeout(u64),
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Row arity mismatch on line {line}: expected {expected} cells, found {found}")]
    RowArityMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Report already finalized: {0}")]
    AlreadyFinalized(String),
    #[error("Report {report_id} is not exportable (status: {status})")]
    NotExportable { report_id: String, status: String },
    #[error("Report {report_id} failed: {cause}")]
    ReportFailed {
        report_id: String,
        cause: Box<AppError>,
    },
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Export error: {0}")]
    ExportError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Security error: {0}")]
    SecurityError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl AppError {
    /// Malformed generation output. These move a draft report to `failed`.
    pub fn is_malformed_output(&self) -> bool {
        matches!(
            self,
            AppError::SchemaMismatch(_) | AppError::RowArityMismatch { .. }
        )
    }

    /// Backend failures. Retrying is left to whoever invoked the pipeline.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            AppError::GenerationUnavailable(_) | AppError::GenerationTimeout(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_arity_message_names_line() {
        let err = AppError::RowArityMismatch {
            line: 1,
            expected: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "Row arity mismatch on line 1: expected 2 cells, found 1"
        );
        assert!(err.is_malformed_output());
        assert!(!err.is_generation_failure());
    }

    #[test]
    fn test_report_failed_wraps_cause() {
        let err = AppError::ReportFailed {
            report_id: "abc".to_string(),
            cause: Box::new(AppError::GenerationTimeout(30)),
        };
        assert_eq!(
            err.to_string(),
            "Report abc failed: Generation timed out after 30s"
        );
    }
}
