use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::error::{AppError, Result};

/// Field separator of the tab-separated wire format.
pub const FIELD_SEPARATOR: char = '\t';

/// Rows x named columns. Every row holds exactly one cell per column, in column order.
///
/// Cells are held in escaped form (see [`escape_cell`]): no cell contains a raw
/// field separator. Use [`GeneratedTable::decoded_rows`] for the text a reader sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl GeneratedTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        validate_columns(&columns)?;

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AppError::RowArityMismatch {
                    line: idx + 1,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            if let Some(col) = row.iter().position(|cell| cell.contains(FIELD_SEPARATOR)) {
                return Err(AppError::SchemaMismatch(format!(
                    "row {} column '{}' contains a raw field separator",
                    idx + 1,
                    columns[col]
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// Rows with every cell unescaped, for formats that carry arbitrary text.
    pub fn decoded_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| unescape_cell(cell)).collect())
    }

    /// Row as a column name -> value mapping.
    pub fn row_map(&self, row: usize) -> Option<BTreeMap<String, String>> {
        self.rows.get(row).map(|cells| {
            self.columns
                .iter()
                .cloned()
                .zip(cells.iter().cloned())
                .collect()
        })
    }
}

/// Column names must be non-empty and unique.
pub fn validate_columns(columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(AppError::ValidationError(
            "A table needs at least one column".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for column in columns {
        if column.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Column names must not be empty".to_string(),
            ));
        }
        if column.contains(FIELD_SEPARATOR) {
            return Err(AppError::ValidationError(format!(
                "Column name contains a field separator: {:?}",
                column
            )));
        }
        if !seen.insert(column.as_str()) {
            return Err(AppError::ValidationError(format!(
                "Duplicate column name: {}",
                column
            )));
        }
    }

    Ok(())
}

/// Decodes `\t`, `\n`, `\r` and `\\`. Other backslashes are kept verbatim.
pub fn unescape_cell(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut chars = cell.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.peek() {
            Some('t') => Some('\t'),
            Some('n') => Some('\n'),
            Some('r') => Some('\r'),
            Some('\\') => Some('\\'),
            _ => None,
        };
        match decoded {
            Some(d) => {
                out.push(d);
                chars.next();
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Inverse of [`unescape_cell`].
pub fn escape_cell(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let err = GeneratedTable::new(cols(&["A", "A"]), Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_new_rejects_short_row() {
        let err = GeneratedTable::new(cols(&["A", "B"]), vec![cols(&["x"])]).unwrap_err();
        assert!(matches!(
            err,
            AppError::RowArityMismatch {
                line: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_new_rejects_raw_separator_in_cell() {
        let err = GeneratedTable::new(cols(&["A"]), vec![cols(&["x\ty"])]).unwrap_err();
        match err {
            AppError::SchemaMismatch(msg) => assert!(msg.contains("column 'A'")),
            other => panic!("unexpected error: {other:?}"),
        }

        let table = GeneratedTable::new(cols(&["A"]), vec![cols(&["x\\ty"])]).unwrap();
        assert_eq!(table.cell(0, "A"), Some("x\\ty"));
        assert_eq!(table.decoded_rows().next().unwrap(), vec!["x\ty"]);
    }

    #[test]
    fn test_new_rejects_separator_in_column_name() {
        let err = GeneratedTable::new(cols(&["A\tB"]), Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_unescape_keeps_unknown_and_trailing_backslash() {
        assert_eq!(unescape_cell("a\\qb\\"), "a\\qb\\");
    }

    #[test]
    fn test_escape_inverts_unescape() {
        let value = "tab\there\nnew\\line\r";
        assert_eq!(unescape_cell(&escape_cell(value)), value);
        assert!(!escape_cell(value).contains(FIELD_SEPARATOR));
    }

    #[test]
    fn test_cell_and_row_map() {
        let table = GeneratedTable::new(
            cols(&["Requirement", "Status"]),
            vec![cols(&["Must register", "Pending"])],
        )
        .unwrap();

        assert_eq!(table.cell(0, "Status"), Some("Pending"));
        assert_eq!(table.cell(0, "Missing"), None);
        assert_eq!(table.cell(1, "Status"), None);

        let map = table.row_map(0).unwrap();
        assert_eq!(map.get("Requirement").map(String::as_str), Some("Must register"));
        assert_eq!(map.len(), 2);
    }
}
