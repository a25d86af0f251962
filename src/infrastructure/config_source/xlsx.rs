use super::{normalize_field_name, ConfigSource};
use crate::domain::error::{AppError, Result};
use crate::domain::master::{ImportCategory, RawRow, SourceRow};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::PathBuf;

/// Reads the `countries`, `regulations` and `templates` sheets of one workbook.
/// Sheet names are matched case-insensitively; the first row is the header.
pub struct XlsxConfigSource {
    path: PathBuf,
}

impl XlsxConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.trim().to_string(),
            other => other.to_string().trim().to_string(),
        }
    }
}

impl ConfigSource for XlsxConfigSource {
    fn read_rows(&self, category: ImportCategory) -> Result<Vec<SourceRow>> {
        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| {
            AppError::IoError(format!(
                "Failed to open workbook {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let sheet = workbook
            .sheet_names()
            .into_iter()
            .find(|name| name.trim().eq_ignore_ascii_case(category.as_str()))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Sheet '{}' in {}",
                    category.as_str(),
                    self.path.display()
                ))
            })?;

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| AppError::IoError(format!("Failed to read sheet {}: {}", sheet, e)))?;

        // Worksheet row number of the header; the used range may not start at row 1.
        let first_line = range.start().map_or(1, |(row, _)| row as usize + 1);
        let mut rows_iter = range.rows().enumerate();
        let Some((_, header_row)) = rows_iter.next() else {
            return Ok(Vec::new());
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| normalize_field_name(&Self::cell_text(cell)))
            .collect();

        let rows = rows_iter
            .filter(|(_, row)| row.iter().any(|cell| !matches!(cell, Data::Empty)))
            .map(|(offset, row)| SourceRow {
                line: first_line + offset,
                fields: headers
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| !name.is_empty())
                    .map(|(idx, name)| {
                        let value = row.get(idx).map(Self::cell_text).unwrap_or_default();
                        (name.clone(), value)
                    })
                    .collect::<RawRow>(),
            })
            .collect();

        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
