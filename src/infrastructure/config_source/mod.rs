// ============================================================
// CONFIG SOURCES
// ============================================================
// Readers that turn config files into decoded rows for import.

mod csv_dir;
mod encoding;
mod xlsx;

pub use csv_dir::CsvDirectorySource;
pub use encoding::decode_text;
pub use xlsx::XlsxConfigSource;

use crate::domain::error::Result;
use crate::domain::master::{ImportCategory, SourceRow};

/// Field holding the inline prompt text of a template row.
pub const TEMPLATE_TEXT_FIELD: &str = "template_text";
/// Field naming a prompt file relative to the source.
pub const TEMPLATE_FILE_FIELD: &str = "template_file";

/// Where master data comes from. Only the importer holds one.
pub trait ConfigSource: Send + Sync {
    /// Rows for one category, in source order, each tagged with its file line.
    /// Field names are lowercased.
    fn read_rows(&self, category: ImportCategory) -> Result<Vec<SourceRow>>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

pub(crate) fn normalize_field_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}
