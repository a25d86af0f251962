use crate::domain::error::{AppError, Result};
use crate::domain::table::{unescape_cell, validate_columns, GeneratedTable, FIELD_SEPARATOR};
use std::collections::HashMap;

/// Strict tab-separated parser for generation output.
///
/// The first non-blank line is the header and must name exactly the expected
/// columns, in any order. Every later non-blank line must have exactly one
/// cell per column. Cells are trimmed and kept in their escaped form, so an
/// escaped separator never becomes a raw one inside the table. Header names are
/// unescaped before matching. The first structural violation aborts the parse.
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(raw: &str, expected_columns: &[String]) -> Result<GeneratedTable> {
        validate_columns(expected_columns)?;

        let mut lines = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !is_blank(line));

        let header_line = lines
            .next()
            .ok_or_else(|| AppError::SchemaMismatch("response contains no header row".to_string()))?;
        let order = Self::column_order(header_line, expected_columns)?;

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            if cells.len() != expected_columns.len() {
                return Err(AppError::RowArityMismatch {
                    line: idx + 1,
                    expected: expected_columns.len(),
                    found: cells.len(),
                });
            }
            rows.push(
                order
                    .iter()
                    .map(|&source| cells[source].trim().to_string())
                    .collect(),
            );
        }

        GeneratedTable::new(expected_columns.to_vec(), rows)
    }

    /// For each expected column, the position it occupies in the header.
    fn column_order(header_line: &str, expected: &[String]) -> Result<Vec<usize>> {
        let header: Vec<String> = header_line
            .split(FIELD_SEPARATOR)
            .map(|name| unescape_cell(name.trim()))
            .collect();

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(header.len());
        for (idx, name) in header.iter().enumerate() {
            if positions.insert(name.as_str(), idx).is_some() {
                return Err(AppError::SchemaMismatch(format!(
                    "duplicate column '{}' in header",
                    name
                )));
            }
        }

        let missing: Vec<&str> = expected
            .iter()
            .map(String::as_str)
            .filter(|name| !positions.contains_key(name))
            .collect();
        let extra: Vec<&str> = header
            .iter()
            .map(String::as_str)
            .filter(|name| !expected.iter().any(|e| e == name))
            .collect();

        if !missing.is_empty() || !extra.is_empty() {
            let mut problems = Vec::new();
            if !missing.is_empty() {
                problems.push(format!("missing columns [{}]", missing.join(", ")));
            }
            if !extra.is_empty() {
                problems.push(format!("unexpected columns [{}]", extra.join(", ")));
            }
            return Err(AppError::SchemaMismatch(problems.join("; ")));
        }

        Ok(expected
            .iter()
            .filter_map(|name| positions.get(name.as_str()).copied())
            .collect())
    }
}

/// A line is blank when it has no separator and nothing but whitespace.
fn is_blank(line: &str) -> bool {
    !line.contains(FIELD_SEPARATOR) && line.trim().is_empty()
}
