use crate::domain::error::{AppError, Result};
use crate::domain::master::{MasterOption, OptionCategory, UpsertOutcome};
use crate::domain::prompt::{PromptTemplate, TemplateKey};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

use super::sqlite::{format_timestamp, Database};

/// Key-indexed storage for options and prompt templates.
///
/// Writes are single `INSERT .. ON CONFLICT .. DO UPDATE` statements: concurrent
/// writers on the same key serialise inside SQLite and the last one wins. The
/// returned revision tells an insert (revision 1) from an overwrite.
pub struct MasterRepository {
    pool: SqlitePool,
}

impl MasterRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    pub async fn upsert_option(&self, option: &MasterOption) -> Result<UpsertOutcome> {
        let now = format_timestamp(&chrono::Utc::now());
        let revision: i64 = sqlx::query_scalar(
            "INSERT INTO master_options (category, code, label, group_label, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (category, code) DO UPDATE SET
                label = excluded.label,
                group_label = excluded.group_label,
                revision = master_options.revision + 1,
                updated_at = excluded.updated_at
             RETURNING revision",
        )
        .bind(option.category.as_str())
        .bind(&option.code)
        .bind(&option.label)
        .bind(&option.group)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert option: {}", e)))?;

        Ok(outcome_from_revision(revision))
    }

    pub async fn upsert_template(&self, template: &PromptTemplate) -> Result<UpsertOutcome> {
        let now = format_timestamp(&chrono::Utc::now());
        let columns_json = serde_json::to_string(&template.columns)
            .map_err(|e| AppError::Internal(format!("Failed to encode columns: {}", e)))?;

        let revision: i64 = sqlx::query_scalar(
            "INSERT INTO prompt_templates
                (country_code, regulation_code, name, template_text, columns_json, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (country_code, regulation_code) DO UPDATE SET
                name = excluded.name,
                template_text = excluded.template_text,
                columns_json = excluded.columns_json,
                revision = prompt_templates.revision + 1,
                updated_at = excluded.updated_at
             RETURNING revision",
        )
        .bind(&template.key.country_code)
        .bind(&template.key.regulation_code)
        .bind(&template.name)
        .bind(&template.text)
        .bind(columns_json)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert template: {}", e)))?;

        Ok(outcome_from_revision(revision))
    }

    /// Options in first-import order.
    pub async fn list_options(&self, category: OptionCategory) -> Result<Vec<MasterOption>> {
        let rows = sqlx::query_as::<_, MasterOptionEntity>(
            "SELECT category, code, label, group_label FROM master_options
             WHERE category = ? ORDER BY id ASC",
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list options: {}", e)))?;

        rows.into_iter().map(MasterOption::try_from).collect()
    }

    pub async fn find_option(
        &self,
        category: OptionCategory,
        code: &str,
    ) -> Result<Option<MasterOption>> {
        let row = sqlx::query_as::<_, MasterOptionEntity>(
            "SELECT category, code, label, group_label FROM master_options
             WHERE category = ? AND code = ?",
        )
        .bind(category.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch option: {}", e)))?;

        row.map(MasterOption::try_from).transpose()
    }

    pub async fn find_template(&self, key: &TemplateKey) -> Result<Option<PromptTemplate>> {
        let row = sqlx::query_as::<_, PromptTemplateEntity>(
            "SELECT country_code, regulation_code, name, template_text, columns_json
             FROM prompt_templates WHERE country_code = ? AND regulation_code = ?",
        )
        .bind(&key.country_code)
        .bind(&key.regulation_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch template: {}", e)))?;

        row.map(PromptTemplate::try_from).transpose()
    }

    /// Templates in first-import order.
    pub async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        let rows = sqlx::query_as::<_, PromptTemplateEntity>(
            "SELECT country_code, regulation_code, name, template_text, columns_json
             FROM prompt_templates ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list templates: {}", e)))?;

        rows.into_iter().map(PromptTemplate::try_from).collect()
    }

    pub async fn count_options(&self, category: OptionCategory) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM master_options WHERE category = ?")
            .bind(category.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count options: {}", e)))
    }

    pub async fn count_templates(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM prompt_templates")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count templates: {}", e)))
    }
}

fn outcome_from_revision(revision: i64) -> UpsertOutcome {
    if revision <= 1 {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    }
}

#[derive(sqlx::FromRow)]
struct MasterOptionEntity {
    category: String,
    code: String,
    label: String,
    group_label: Option<String>,
}

impl TryFrom<MasterOptionEntity> for MasterOption {
    type Error = AppError;

    fn try_from(entity: MasterOptionEntity) -> Result<Self> {
        Ok(Self {
            category: OptionCategory::from_str(&entity.category)?,
            code: entity.code,
            label: entity.label,
            group: entity.group_label,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PromptTemplateEntity {
    country_code: String,
    regulation_code: String,
    name: String,
    template_text: String,
    columns_json: String,
}

impl TryFrom<PromptTemplateEntity> for PromptTemplate {
    type Error = AppError;

    fn try_from(entity: PromptTemplateEntity) -> Result<Self> {
        let columns: Vec<String> = serde_json::from_str(&entity.columns_json).map_err(|e| {
            AppError::DatabaseError(format!("Invalid stored template columns: {}", e))
        })?;

        Ok(Self {
            key: TemplateKey::new(entity.country_code, entity.regulation_code),
            name: entity.name,
            text: entity.template_text,
            columns,
        })
    }
}
