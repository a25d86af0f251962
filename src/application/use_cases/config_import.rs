use crate::domain::error::{AppError, Result};
use crate::domain::master::{
    ImportCategory, ImportResult, MasterOption, OptionCategory, RawRow, RejectedRow, SourceRow,
    UpsertOutcome,
};
use crate::domain::prompt::{PromptTemplate, TemplateKey};
use crate::domain::table::validate_columns;
use crate::infrastructure::config_source::{ConfigSource, TEMPLATE_FILE_FIELD, TEMPLATE_TEXT_FIELD};
use crate::infrastructure::db::MasterRepository;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

/// Codes end up in URLs and file names.
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").unwrap());

const COLUMN_LIST_SEPARATOR: char = '|';

#[derive(Debug, Validate)]
struct OptionRow {
    #[validate(
        length(max = 64),
        regex(path = *CODE_PATTERN, message = "only letters, digits, '_', '-' and '.' are allowed")
    )]
    code: String,
    #[validate(length(min = 1, max = 256))]
    label: String,
    #[validate(length(max = 128))]
    group: Option<String>,
}

#[derive(Debug, Validate)]
struct TemplateRow {
    #[validate(
        length(max = 64),
        regex(path = *CODE_PATTERN, message = "only letters, digits, '_', '-' and '.' are allowed")
    )]
    country_code: String,
    #[validate(
        length(max = 64),
        regex(path = *CODE_PATTERN, message = "only letters, digits, '_', '-' and '.' are allowed")
    )]
    regulation_code: String,
    #[validate(length(min = 1, max = 128))]
    name: String,
    #[validate(length(min = 1, max = 65536))]
    text: String,
    columns: Vec<String>,
}

/// Upserts config rows into the master tables.
///
/// Each row stands alone: a bad row is reported in `rejected` and the rest of
/// the batch still lands. This is the only component that may read config files.
pub struct ConfigImporter {
    repository: Arc<MasterRepository>,
    source: Option<Arc<dyn ConfigSource>>,
}

impl ConfigImporter {
    pub fn new(repository: Arc<MasterRepository>) -> Self {
        Self {
            repository,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Reads `category` from the attached source and imports it. Rejected rows
    /// carry their line in the source file.
    pub async fn import_from_source(&self, category: ImportCategory) -> Result<ImportResult> {
        let source = self.source.as_ref().ok_or_else(|| {
            AppError::ConfigError("No config source attached to the importer".to_string())
        })?;

        let rows = source.read_rows(category)?;
        info!(
            category = %category,
            source = %source.describe(),
            rows = rows.len(),
            "Importing config rows"
        );
        self.import_lines(category, rows.iter().map(|row| (row.line, &row.fields)))
            .await
    }

    /// Imports an in-memory batch. Rejected rows carry their 1-based position.
    pub async fn import(&self, category: ImportCategory, rows: &[RawRow]) -> Result<ImportResult> {
        let lines: Vec<(usize, &RawRow)> =
            rows.iter().enumerate().map(|(idx, row)| (idx + 1, row)).collect();
        self.import_lines(category, lines)
            .await
    }

    async fn import_lines<'a>(
        &self,
        category: ImportCategory,
        rows: impl IntoIterator<Item = (usize, &'a RawRow)>,
    ) -> Result<ImportResult> {
        let mut result = ImportResult::default();

        for (line, row) in rows {
            let outcome = match category.option_category() {
                Some(option_category) => match option_from_row(option_category, row) {
                    Ok(option) => self.repository.upsert_option(&option).await,
                    Err(reason) => {
                        reject(&mut result, category, line, row, reason);
                        continue;
                    }
                },
                None => match template_from_row(row) {
                    Ok(template) => self.repository.upsert_template(&template).await,
                    Err(reason) => {
                        reject(&mut result, category, line, row, reason);
                        continue;
                    }
                },
            };

            // Storage failures are not row problems; they abort the batch.
            match outcome? {
                UpsertOutcome::Inserted => result.inserted += 1,
                UpsertOutcome::Updated => result.updated += 1,
            }
        }

        info!(
            category = %category,
            inserted = result.inserted,
            updated = result.updated,
            rejected = result.rejected.len(),
            "Import finished"
        );

        Ok(result)
    }
}

fn reject(result: &mut ImportResult, category: ImportCategory, line: usize, row: &RawRow, reason: String) {
    warn!(category = %category, line, reason = %reason, "Rejected config row");
    result.rejected.push(RejectedRow {
        line,
        row: row.clone(),
        reason,
    });
}

fn field<'a>(row: &'a RawRow, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| row.get(*name))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

fn required<'a>(row: &'a RawRow, names: &[&str]) -> std::result::Result<&'a str, String> {
    field(row, names).ok_or_else(|| format!("missing required field '{}'", names[0]))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut problems: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(name, errs)| {
            let details: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("invalid {}: {}", name, details.join(", "))
        })
        .collect();
    problems.sort();
    problems.join("; ")
}

fn option_from_row(
    category: OptionCategory,
    row: &RawRow,
) -> std::result::Result<MasterOption, String> {
    let parsed = OptionRow {
        code: required(row, &["code"])?.to_string(),
        label: required(row, &["label", "name"])?.to_string(),
        group: field(row, &["group", "continent"]).map(str::to_string),
    };
    parsed.validate().map_err(|e| describe(&e))?;

    Ok(MasterOption {
        category,
        code: parsed.code,
        label: parsed.label,
        group: parsed.group,
    })
}

fn template_from_row(row: &RawRow) -> std::result::Result<PromptTemplate, String> {
    let country_code = required(row, &["country_code"])?;
    let regulation_code = required(row, &["regulation_code"])?;

    let text = match row.get(TEMPLATE_TEXT_FIELD).filter(|t| !t.trim().is_empty()) {
        Some(text) => text.clone(),
        None => {
            return Err(match field(row, &[TEMPLATE_FILE_FIELD]) {
                Some(file) => format!("template file '{}' could not be read", file),
                None => format!(
                    "missing required field '{}' or '{}'",
                    TEMPLATE_TEXT_FIELD, TEMPLATE_FILE_FIELD
                ),
            })
        }
    };

    let name = field(row, &["name"])
        .map(str::to_string)
        .or_else(|| {
            field(row, &[TEMPLATE_FILE_FIELD]).and_then(|file| {
                Path::new(file)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
        })
        .unwrap_or_else(|| format!("{}_{}", country_code, regulation_code));

    let columns: Vec<String> = field(row, &["columns"])
        .map(|list| {
            list.split(COLUMN_LIST_SEPARATOR)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if !columns.is_empty() {
        validate_columns(&columns).map_err(|e| e.to_string())?;
    }

    let parsed = TemplateRow {
        country_code: country_code.to_string(),
        regulation_code: regulation_code.to_string(),
        name,
        text,
        columns,
    };
    parsed.validate().map_err(|e| describe(&e))?;

    Ok(PromptTemplate {
        key: TemplateKey::new(parsed.country_code, parsed.regulation_code),
        name: parsed.name,
        text: parsed.text,
        columns: parsed.columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config_source::CsvDirectorySource;
    use crate::infrastructure::db::sqlite::test_support::temp_database;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn countries() -> Vec<RawRow> {
        vec![
            row(&[("code", "JP"), ("label", "Japan"), ("group", "Asia")]),
            row(&[("code", "FR"), ("label", "France"), ("group", "Europe")]),
        ]
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (_dir, db) = temp_database().await;
        let repository = Arc::new(MasterRepository::new(&db));
        let importer = ConfigImporter::new(repository.clone());

        let first = importer.import(ImportCategory::Countries, &countries()).await.unwrap();
        assert_eq!((first.inserted, first.updated), (2, 0));
        let before = repository.list_options(OptionCategory::Country).await.unwrap();

        let second = importer.import(ImportCategory::Countries, &countries()).await.unwrap();
        assert_eq!((second.inserted, second.updated), (0, 2));
        let after = repository.list_options(OptionCategory::Country).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_changed_label_updates_only_that_entry() {
        let (_dir, db) = temp_database().await;
        let repository = Arc::new(MasterRepository::new(&db));
        let importer = ConfigImporter::new(repository.clone());
        importer.import(ImportCategory::Countries, &countries()).await.unwrap();

        let mut changed = countries();
        changed[1].insert("label".to_string(), "République française".to_string());
        importer.import(ImportCategory::Countries, &changed).await.unwrap();

        let options = repository.list_options(OptionCategory::Country).await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].label, "Japan");
        assert_eq!(options[1].label, "République française");
    }

    #[tokio::test]
    async fn test_bad_rows_are_rejected_without_aborting() {
        let (_dir, db) = temp_database().await;
        let repository = Arc::new(MasterRepository::new(&db));
        let importer = ConfigImporter::new(repository.clone());

        let rows = vec![
            row(&[("code", "GDPR"), ("label", "GDPR")]),
            row(&[("code", ""), ("label", "Nameless")]),
            row(&[("code", "bad code"), ("label", "Spaces")]),
            row(&[("code", "APPI"), ("name", "Act on the Protection of Personal Information")]),
        ];
        let result = importer.import(ImportCategory::Regulations, &rows).await.unwrap();

        assert_eq!(result.inserted, 2);
        assert_eq!(result.rejected.len(), 2);
        assert_eq!(result.rejected[0].line, 2);
        assert!(result.rejected[0].reason.contains("code"));
        assert_eq!(result.rejected[1].line, 3);
        assert_eq!(repository.count_options(OptionCategory::Regulation).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_template_rows_with_columns() {
        let (_dir, db) = temp_database().await;
        let repository = Arc::new(MasterRepository::new(&db));
        let importer = ConfigImporter::new(repository.clone());

        let rows = vec![
            row(&[
                ("country_code", "JP"),
                ("regulation_code", "GDPR"),
                ("template_text", "Report for {{country}}"),
                ("columns", "Requirement | Status"),
            ]),
            row(&[("country_code", "JP"), ("regulation_code", "APPI")]),
            row(&[
                ("country_code", "JP"),
                ("regulation_code", "CCPA"),
                ("template_text", "x"),
                ("columns", "A|A"),
            ]),
        ];
        let result = importer.import(ImportCategory::Templates, &rows).await.unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.rejected.len(), 2);

        let template = repository
            .find_template(&TemplateKey::new("JP", "GDPR"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.name, "JP_GDPR");
        assert_eq!(template.columns, vec!["Requirement", "Status"]);
    }

    #[tokio::test]
    async fn test_import_from_directory_source() {
        let (_dir, db) = temp_database().await;
        let config_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            config_dir.path().join("templates.csv"),
            "country_code,regulation_code,template_file\nJP,GDPR,jp_gdpr.md\nJP,APPI,absent.md\n",
        )
        .unwrap();
        std::fs::write(config_dir.path().join("jp_gdpr.md"), "Summarize {{regulation}}").unwrap();

        let repository = Arc::new(MasterRepository::new(&db));
        let importer = ConfigImporter::new(repository.clone())
            .with_source(Arc::new(CsvDirectorySource::new(config_dir.path())));

        let result = importer.import_from_source(ImportCategory::Templates).await.unwrap();
        assert_eq!(result.inserted, 1);
        assert!(result.rejected[0].reason.contains("absent.md"));
        // Header is line 1, so the second data row sits on line 3 of the file.
        assert_eq!(result.rejected[0].line, 3);

        let template = repository
            .find_template(&TemplateKey::new("JP", "GDPR"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(template.name, "jp_gdpr");
    }

    #[tokio::test]
    async fn test_import_without_source_is_config_error() {
        let (_dir, db) = temp_database().await;
        let importer = ConfigImporter::new(Arc::new(MasterRepository::new(&db)));
        let err = importer.import_from_source(ImportCategory::Countries).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_imports_of_one_key_keep_a_single_entry() {
        const WRITERS: usize = 16;
        let (_dir, db) = temp_database().await;
        let repository = Arc::new(MasterRepository::new(&db));
        let importer = Arc::new(ConfigImporter::new(repository.clone()));

        let labels: Vec<String> = (0..WRITERS).map(|i| format!("Japan {}", i)).collect();
        let handles: Vec<_> = labels
            .iter()
            .map(|label| {
                let importer = importer.clone();
                let rows = vec![row(&[("code", "JP"), ("label", label.as_str())])];
                tokio::spawn(async move { importer.import(ImportCategory::Countries, &rows).await })
            })
            .collect();

        let (mut inserted, mut updated) = (0, 0);
        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert!(result.rejected.is_empty());
            inserted += result.inserted;
            updated += result.updated;
        }
        assert_eq!(inserted, 1);
        assert_eq!(updated, WRITERS - 1);

        let options = repository.list_options(OptionCategory::Country).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].code, "JP");
        assert!(labels.contains(&options[0].label));
    }
}
