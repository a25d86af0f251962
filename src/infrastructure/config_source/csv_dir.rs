use super::{decode_text, normalize_field_name, ConfigSource, TEMPLATE_FILE_FIELD, TEMPLATE_TEXT_FIELD};
use crate::domain::error::{AppError, Result};
use crate::domain::master::{ImportCategory, RawRow, SourceRow};
use csv::{ReaderBuilder, Trim};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Reads `countries.csv`, `regulations.csv` and `templates.csv` from one directory.
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, category: ImportCategory) -> PathBuf {
        self.dir.join(format!("{}.csv", category.as_str()))
    }

    fn read_decoded(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("Config file {}", path.display()))
            }
            _ => AppError::IoError(format!("Failed to read {}: {}", path.display(), e)),
        })?;
        Ok(decode_text(&bytes))
    }

    /// Inlines `template_file` into `template_text` when the row has no inline text.
    /// Unreadable files leave the row without text so the importer rejects it.
    fn resolve_template_file(&self, row: &mut RawRow) {
        let has_text = row
            .get(TEMPLATE_TEXT_FIELD)
            .map_or(false, |t| !t.trim().is_empty());
        if has_text {
            return;
        }
        let Some(file) = row.get(TEMPLATE_FILE_FIELD).filter(|f| !f.trim().is_empty()) else {
            return;
        };

        let path = self.dir.join(file.trim());
        match Self::read_decoded(&path) {
            Ok(text) => {
                row.insert(TEMPLATE_TEXT_FIELD.to_string(), text);
            }
            Err(e) => warn!(file = %path.display(), error = %e, "Template file unreadable"),
        }
    }
}

impl ConfigSource for CsvDirectorySource {
    fn read_rows(&self, category: ImportCategory) -> Result<Vec<SourceRow>> {
        let path = self.file_for(category);
        let content = Self::read_decoded(&path)?;
        let mut rows = parse_csv_rows(&content)?;

        if category == ImportCategory::Templates {
            for row in rows.iter_mut() {
                self.resolve_template_file(&mut row.fields);
            }
        }

        Ok(rows)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Parses CSV text with a header line into rows keyed by lowercased header.
/// Line numbers follow the file, so quoted multi-line cells shift later rows.
pub(crate) fn parse_csv_rows(content: &str) -> Result<Vec<SourceRow>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::ValidationError(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(normalize_field_name)
        .collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::ValidationError(format!("Failed to parse CSV row {}: {}", index + 1, e))
        })?;

        let line = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(index + 2);
        let fields: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(idx, name)| (name.clone(), record.get(idx).unwrap_or("").to_string()))
            .collect();
        rows.push(SourceRow { line, fields });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_lowercases_headers() {
        let rows = parse_csv_rows("Code, Label ,Group\nJP, Japan ,Asia\nFR,France,\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields["code"], "JP");
        assert_eq!(rows[0].fields["label"], "Japan");
        assert_eq!(rows[1].fields["group"], "");
    }

    #[test]
    fn test_short_record_fills_blank_fields() {
        let rows = parse_csv_rows("code,label\nJP\n").unwrap();
        assert_eq!(rows[0].fields["label"], "");
    }

    #[test]
    fn test_quoted_multiline_template_text() {
        let rows = parse_csv_rows(
            "country_code,regulation_code,template_text\nJP,GDPR,\"Line one\nfor {{country}}\"\n",
        )
        .unwrap();
        assert_eq!(rows[0].fields["template_text"], "Line one\nfor {{country}}");
    }

    #[test]
    fn test_rows_carry_file_line_numbers() {
        let rows = parse_csv_rows(
            "code,label\nJP,Japan\nFR,\"France\nRepublic\"\nDE,Germany\n",
        )
        .unwrap();
        let lines: Vec<usize> = rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3, 5]);
    }

    #[test]
    fn test_reads_directory_and_template_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("countries.csv"), "code,label\nJP,Japan\n").unwrap();
        std::fs::write(
            dir.path().join("templates.csv"),
            "country_code,regulation_code,template_file\nJP,GDPR,jp_gdpr.md\nJP,APPI,missing.md\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("jp_gdpr.md"), "Summarize {{regulation}}").unwrap();

        let source = CsvDirectorySource::new(dir.path());
        let countries = source.read_rows(ImportCategory::Countries).unwrap();
        assert_eq!(countries[0].fields["label"], "Japan");
        assert_eq!(countries[0].line, 2);

        let templates = source.read_rows(ImportCategory::Templates).unwrap();
        assert_eq!(templates[0].fields["template_text"], "Summarize {{regulation}}");
        assert!(!templates[1].fields.contains_key("template_text"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvDirectorySource::new(dir.path());
        let err = source.read_rows(ImportCategory::Regulations).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
