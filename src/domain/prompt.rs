use serde::{Deserialize, Serialize};

/// Composite key of a prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateKey {
    pub country_code: String,
    pub regulation_code: String,
}

impl TemplateKey {
    pub fn new(country_code: impl Into<String>, regulation_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            regulation_code: regulation_code.into(),
        }
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.country_code, self.regulation_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub key: TemplateKey,
    /// Human readable name recorded on reports, e.g. the source file stem.
    pub name: String,
    /// Template body with `{{name}}` placeholders.
    pub text: String,
    /// Columns the generated table must have. Empty means "use the configured default".
    pub columns: Vec<String>,
}

impl PromptTemplate {
    pub fn expected_columns<'a>(&'a self, fallback: &'a [String]) -> &'a [String] {
        if self.columns.is_empty() {
            fallback
        } else {
            &self.columns
        }
    }
}
