use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::error::AppError;

/// One decoded config row: field name -> raw value.
pub type RawRow = HashMap<String, String>;

/// A row read from a config file, with the 1-based file line it starts on
/// (header included, so the first data row of a CSV is line 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub line: usize,
    pub fields: RawRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionCategory {
    Country,
    Regulation,
}

impl OptionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionCategory::Country => "country",
            OptionCategory::Regulation => "regulation",
        }
    }
}

impl fmt::Display for OptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" | "countries" => Ok(OptionCategory::Country),
            "regulation" | "regulations" => Ok(OptionCategory::Regulation),
            other => Err(AppError::ValidationError(format!(
                "Unknown option category: {}",
                other
            ))),
        }
    }
}

/// What a single import run targets. Each target is imported independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportCategory {
    Countries,
    Regulations,
    Templates,
}

impl ImportCategory {
    pub const ALL: [ImportCategory; 3] = [
        ImportCategory::Countries,
        ImportCategory::Regulations,
        ImportCategory::Templates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportCategory::Countries => "countries",
            ImportCategory::Regulations => "regulations",
            ImportCategory::Templates => "templates",
        }
    }

    pub fn option_category(&self) -> Option<OptionCategory> {
        match self {
            ImportCategory::Countries => Some(OptionCategory::Country),
            ImportCategory::Regulations => Some(OptionCategory::Regulation),
            ImportCategory::Templates => None,
        }
    }
}

impl From<OptionCategory> for ImportCategory {
    fn from(category: OptionCategory) -> Self {
        match category {
            OptionCategory::Country => ImportCategory::Countries,
            OptionCategory::Regulation => ImportCategory::Regulations,
        }
    }
}

impl fmt::Display for ImportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "countries" | "country" => Ok(ImportCategory::Countries),
            "regulations" | "regulation" => Ok(ImportCategory::Regulations),
            "templates" | "template" => Ok(ImportCategory::Templates),
            other => Err(AppError::ValidationError(format!(
                "Unknown import category: {}",
                other
            ))),
        }
    }
}

/// Selectable lookup entry (a country or a regulation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterOption {
    pub category: OptionCategory,
    pub code: String,
    pub label: String,
    /// Display grouping, e.g. the continent of a country.
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionGroup {
    pub name: String,
    pub options: Vec<MasterOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line in the source file, or the row's position when the
    /// batch was passed in directly.
    pub line: usize,
    pub row: RawRow,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: Vec<RejectedRow>,
}

impl ImportResult {
    pub fn accepted(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Outcome of a single keyed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing_accepts_singular_and_plural() {
        assert_eq!(
            "Countries".parse::<ImportCategory>().unwrap(),
            ImportCategory::Countries
        );
        assert_eq!(
            "regulation".parse::<OptionCategory>().unwrap(),
            OptionCategory::Regulation
        );
        assert!("prompts".parse::<ImportCategory>().is_err());
    }

    #[test]
    fn test_templates_have_no_option_category() {
        assert_eq!(ImportCategory::Templates.option_category(), None);
        assert_eq!(
            ImportCategory::from(OptionCategory::Country),
            ImportCategory::Countries
        );
    }
}
