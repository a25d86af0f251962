use super::master_catalog::MasterCatalog;
use super::prompt_builder::PromptBuilder;
use crate::domain::error::{AppError, Result};
use crate::domain::master::OptionCategory;
use crate::domain::report::ReportSelection;
use crate::domain::table::validate_columns;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

/// The prompt a selection resolves to, before anything is stored.
#[derive(Debug, Clone, Serialize)]
pub struct PromptPreview {
    pub template_name: String,
    pub prompt_text: String,
    /// Columns the generated table must carry.
    pub columns: Vec<String>,
}

pub struct PreviewPromptUseCase {
    catalog: Arc<MasterCatalog>,
    default_columns: Vec<String>,
}

impl PreviewPromptUseCase {
    pub fn new(catalog: Arc<MasterCatalog>, default_columns: Vec<String>) -> Self {
        Self {
            catalog,
            default_columns,
        }
    }

    /// Resolves options and template, then fills the template.
    ///
    /// Variables: `country`, `country_code`, `country_group`, `regulation`,
    /// `regulation_code`, `user_input` and `columns` (comma separated).
    pub async fn execute(&self, selection: &ReportSelection) -> Result<PromptPreview> {
        selection.validate()?;

        let country = self
            .catalog
            .option(OptionCategory::Country, &selection.country_code)
            .await?;
        let regulation = self
            .catalog
            .option(OptionCategory::Regulation, &selection.regulation_code)
            .await?;
        let template = self
            .catalog
            .template_for(&selection.country_code, &selection.regulation_code)
            .await?;

        let columns = template.expected_columns(&self.default_columns).to_vec();
        validate_columns(&columns).map_err(|_| {
            AppError::ValidationError(format!(
                "Template '{}' declares no usable columns and no default columns are configured",
                template.name
            ))
        })?;

        let variables: HashMap<String, String> = [
            ("country", country.label),
            ("country_code", country.code),
            ("country_group", country.group.unwrap_or_default()),
            ("regulation", regulation.label),
            ("regulation_code", regulation.code),
            ("user_input", selection.user_input.clone()),
            ("columns", columns.join(", ")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let prompt_text = PromptBuilder::build(&template.text, &variables)?;
        debug!(
            template = %template.name,
            prompt_chars = prompt_text.chars().count(),
            "Prompt built"
        );

        Ok(PromptPreview {
            template_name: template.name,
            prompt_text,
            columns,
        })
    }
}
