use crate::domain::error::{AppError, Result};
use crate::domain::report::{Report, ReportStatus};
use crate::domain::table::{escape_cell, GeneratedTable, FIELD_SEPARATOR};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Tsv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Tsv => "tsv",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Tsv => "text/tab-separated-values; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "tsv" => Ok(ExportFormat::Tsv),
            other => Err(AppError::ValidationError(format!(
                "Unknown export format: {}",
                other
            ))),
        }
    }
}

/// Serializes complete reports. Output depends only on the stored table.
pub struct Exporter {
    sheet_name: String,
}

impl Exporter {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }

    pub fn export(&self, report: &Report, format: ExportFormat) -> Result<Vec<u8>> {
        match format {
            ExportFormat::Csv => self.to_csv(report),
            ExportFormat::Xlsx => self.to_spreadsheet(report),
            ExportFormat::Tsv => self.to_tsv(report),
        }
    }

    /// RFC 4180 style: CRLF line ends, cells quoted only when they need it.
    /// Cells are unescaped, so an escaped tab or newline is written as the real character.
    pub fn to_csv(&self, report: &Report) -> Result<Vec<u8>> {
        let table = exportable_table(report)?;
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer
            .write_record(table.columns())
            .map_err(|e| AppError::ExportError(format!("Failed to write CSV header: {}", e)))?;
        for row in table.decoded_rows() {
            writer
                .write_record(&row)
                .map_err(|e| AppError::ExportError(format!("Failed to write CSV row: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::ExportError(format!("Failed to flush CSV: {}", e)))
    }

    /// One worksheet with a bold header row.
    pub fn to_spreadsheet(&self, report: &Report) -> Result<Vec<u8>> {
        let table = exportable_table(report)?;
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.sheet_name)
            .map_err(|e| AppError::ExportError(format!("Invalid sheet name: {}", e)))?;

        for (col, name) in table.columns().iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, name, &header_format)
                .map_err(|e| AppError::ExportError(format!("Failed to write header: {}", e)))?;
        }
        for (row_idx, row) in table.decoded_rows().enumerate() {
            for (col, value) in row.iter().enumerate() {
                sheet
                    .write_string((row_idx + 1) as u32, col as u16, value)
                    .map_err(|e| AppError::ExportError(format!("Failed to write cell: {}", e)))?;
            }
        }

        workbook
            .save_to_buffer()
            .map_err(|e| AppError::ExportError(format!("Failed to build workbook: {}", e)))
    }

    /// Tab-separated, LF line ends. Cells are already escaped the way the
    /// parser reads them and are written unchanged.
    pub fn to_tsv(&self, report: &Report) -> Result<Vec<u8>> {
        let table = exportable_table(report)?;
        let separator = FIELD_SEPARATOR.to_string();
        let header: Vec<String> = table.columns().iter().map(|c| escape_cell(c)).collect();
        let mut out = header.join(&separator);
        out.push('\n');
        for row in table.rows() {
            out.push_str(&row.join(&separator));
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

fn exportable_table(report: &Report) -> Result<&GeneratedTable> {
    if report.status != ReportStatus::Complete {
        return Err(AppError::NotExportable {
            report_id: report.id.clone(),
            status: report.status.as_str().to_string(),
        });
    }
    report.table.as_ref().ok_or_else(|| {
        AppError::Internal(format!("Complete report {} has no table", report.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::response_parser::ResponseParser;
    use crate::domain::report::ReportSelection;
    use calamine::{Data, Reader, Xlsx};
    use std::io::Cursor;

    fn report(status: ReportStatus, rows: Vec<Vec<&str>>) -> Report {
        let table = GeneratedTable::new(
            vec!["Requirement".to_string(), "Status".to_string()],
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        )
        .unwrap();
        Report {
            id: "r1".to_string(),
            created_at: chrono::Utc::now(),
            selection: ReportSelection::new("JP", "GDPR", "summarize"),
            template_name: "jp_gdpr".to_string(),
            prompt_text: "prompt".to_string(),
            status,
            table: (status == ReportStatus::Complete).then_some(table),
            failure_reason: None,
            finalized_at: None,
        }
    }

    fn exporter() -> Exporter {
        Exporter::new("Generated Result")
    }

    #[test]
    fn test_csv_quotes_only_when_needed() {
        let report = report(
            ReportStatus::Complete,
            vec![
                vec!["Must register", "Pending"],
                vec!["Fees, taxes", "Say \"yes\""],
                vec!["Two\\nlines", "back\\\\slash"],
            ],
        );
        let csv = String::from_utf8(exporter().to_csv(&report).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Requirement,Status\r\nMust register,Pending\r\n\"Fees, taxes\",\"Say \"\"yes\"\"\"\r\n\"Two\nlines\",back\\slash\r\n"
        );
    }

    #[test]
    fn test_csv_is_deterministic() {
        let report = report(ReportStatus::Complete, vec![vec!["Must register", "Pending"]]);
        assert_eq!(
            exporter().to_csv(&report).unwrap(),
            exporter().to_csv(&report).unwrap()
        );
    }

    #[test]
    fn test_incomplete_reports_are_not_exportable() {
        for status in [ReportStatus::Draft, ReportStatus::Failed] {
            let report = report(status, vec![]);
            for format in [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Tsv] {
                let err = exporter().export(&report, format).unwrap_err();
                assert!(matches!(err, AppError::NotExportable { .. }));
            }
        }
    }

    #[test]
    fn test_spreadsheet_cells_match_table() {
        let report = report(
            ReportStatus::Complete,
            vec![vec!["Must register", "Pending"], vec!["File\\nannually", "C:\\path"]],
        );
        let bytes = exporter().to_spreadsheet(&report).unwrap();

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Generated Result".to_string()]);
        let range = workbook.worksheet_range("Generated Result").unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|c| match c {
                        Data::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect();
        assert_eq!(
            cells,
            vec![
                vec!["Requirement", "Status"],
                vec!["Must register", "Pending"],
                vec!["File\nannually", "C:\\path"],
            ]
        );
    }

    #[test]
    fn test_tsv_reparses_to_same_table() {
        let report = report(
            ReportStatus::Complete,
            vec![vec!["tab\\tinside", "back\\\\slash"]],
        );
        let tsv = String::from_utf8(exporter().to_tsv(&report).unwrap()).unwrap();
        assert_eq!(tsv, "Requirement\tStatus\ntab\\tinside\tback\\\\slash\n");
        let table = report.table.as_ref().unwrap();
        let reparsed = ResponseParser::parse(&tsv, table.columns()).unwrap();
        assert_eq!(&reparsed, table);
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!("Excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert!(ExportFormat::Xlsx.mime_type().contains("spreadsheetml"));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
