use crate::domain::error::{AppError, Result};
use crate::domain::master::{MasterOption, OptionCategory, OptionGroup};
use crate::domain::prompt::{PromptTemplate, TemplateKey};
use crate::infrastructure::db::MasterRepository;
use std::sync::Arc;

/// Label for options imported without a group.
pub const UNGROUPED_LABEL: &str = "Other";

/// Read-only view of the master tables.
pub struct MasterCatalog {
    repository: Arc<MasterRepository>,
}

impl MasterCatalog {
    pub fn new(repository: Arc<MasterRepository>) -> Self {
        Self { repository }
    }

    /// Options in first-import order. Re-imports keep an option's position.
    pub async fn options(&self, category: OptionCategory) -> Result<Vec<MasterOption>> {
        self.repository.list_options(category).await
    }

    /// Options grouped by their group label; groups appear in the order their
    /// first member was imported.
    pub async fn options_grouped(&self, category: OptionCategory) -> Result<Vec<OptionGroup>> {
        let options = self.options(category).await?;
        Ok(group_options(options))
    }

    pub async fn option(&self, category: OptionCategory, code: &str) -> Result<MasterOption> {
        self.repository
            .find_option(category, code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} '{}'", category, code)))
    }

    pub async fn template_for(
        &self,
        country_code: &str,
        regulation_code: &str,
    ) -> Result<PromptTemplate> {
        let key = TemplateKey::new(country_code, regulation_code);
        self.repository
            .find_template(&key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("prompt template for {}", key)))
    }

    pub async fn templates(&self) -> Result<Vec<PromptTemplate>> {
        self.repository.list_templates().await
    }

    pub async fn count(&self, category: OptionCategory) -> Result<i64> {
        self.repository.count_options(category).await
    }

    pub async fn template_count(&self) -> Result<i64> {
        self.repository.count_templates().await
    }
}

fn group_options(options: Vec<MasterOption>) -> Vec<OptionGroup> {
    let mut groups: Vec<OptionGroup> = Vec::new();
    for option in options {
        let name = option
            .group
            .clone()
            .unwrap_or_else(|| UNGROUPED_LABEL.to_string());
        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.options.push(option),
            None => groups.push(OptionGroup {
                name,
                options: vec![option],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::sqlite::test_support::temp_database;

    fn country(code: &str, label: &str, group: Option<&str>) -> MasterOption {
        MasterOption {
            category: OptionCategory::Country,
            code: code.to_string(),
            label: label.to_string(),
            group: group.map(str::to_string),
        }
    }

    #[test]
    fn test_group_options_keeps_first_appearance_order() {
        let groups = group_options(vec![
            country("JP", "Japan", Some("Asia")),
            country("FR", "France", Some("Europe")),
            country("XX", "Nowhere", None),
            country("KR", "Korea", Some("Asia")),
        ]);

        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Asia", "Europe", UNGROUPED_LABEL]);
        assert_eq!(groups[0].options.len(), 2);
        assert_eq!(groups[0].options[1].code, "KR");
    }

    #[tokio::test]
    async fn test_template_for_missing_is_not_found() {
        let (_dir, db) = temp_database().await;
        let catalog = MasterCatalog::new(Arc::new(MasterRepository::new(&db)));

        let err = catalog.template_for("JP", "GDPR").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("JP/GDPR")));
    }

    #[tokio::test]
    async fn test_lookups_and_counts() {
        let (_dir, db) = temp_database().await;
        let repository = Arc::new(MasterRepository::new(&db));
        repository
            .upsert_option(&country("JP", "Japan", Some("Asia")))
            .await
            .unwrap();
        repository
            .upsert_template(&PromptTemplate {
                key: TemplateKey::new("JP", "GDPR"),
                name: "jp_gdpr".to_string(),
                text: String::new(),
                columns: Vec::new(),
            })
            .await
            .unwrap();
        let catalog = MasterCatalog::new(repository);

        assert_eq!(catalog.option(OptionCategory::Country, "JP").await.unwrap().label, "Japan");
        assert!(matches!(
            catalog.option(OptionCategory::Regulation, "JP").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(catalog.count(OptionCategory::Country).await.unwrap(), 1);
        assert_eq!(catalog.template_count().await.unwrap(), 1);

        // An empty template is still a template, distinct from NotFound.
        let template = catalog.template_for("JP", "GDPR").await.unwrap();
        assert!(template.text.is_empty());
    }
}
