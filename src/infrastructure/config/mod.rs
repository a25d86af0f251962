use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

pub const DEFAULT_CONFIG_FILE: &str = "regreport.toml";
pub const ENV_PREFIX: &str = "REGREPORT_";
const KEYRING_SERVICE: &str = "regreport";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    #[validate(range(min = 1, max = 64))]
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/regreport.db"),
            max_connections: 4,
            busy_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory holding `countries.csv`, `regulations.csv` and `templates.csv`.
    pub config_dir: PathBuf,
    /// Optional workbook with `countries`, `regulations` and `templates` sheets.
    /// Takes precedence over `config_dir` when set.
    pub workbook: Option<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("data/csv"),
            workbook: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Expected columns for templates that do not declare their own.
    pub default_columns: Vec<String>,
    pub sheet_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_columns: Vec::new(),
            sheet_name: "Generated Result".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub import: ImportConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Defaults, then `regreport.toml` (or `path`), then `REGREPORT_*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::ConfigError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }

        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        self.database
            .validate()
            .map_err(|e| AppError::ConfigError(format!("database: {}", e)))?;

        url::Url::parse(&self.llm.base_url).map_err(|e| {
            AppError::ConfigError(format!("llm.base_url '{}': {}", self.llm.base_url, e))
        })?;

        if self.llm.model.trim().is_empty() {
            return Err(AppError::ConfigError("llm.model must not be empty".to_string()));
        }

        if self.report.sheet_name.trim().is_empty() || self.report.sheet_name.chars().count() > 31 {
            return Err(AppError::ConfigError(
                "report.sheet_name must be 1-31 characters".to_string(),
            ));
        }

        Ok(())
    }
}

/// Stores and resolves backend credentials.
pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    pub fn save_api_key(&self, provider: LLMProvider, key: &str) -> Result<()> {
        self.keyring.set_secret(provider.keyring_account(), key)
    }

    pub fn get_api_key(&self, provider: LLMProvider) -> Result<String> {
        self.keyring.get_secret(provider.keyring_account())
    }

    pub fn delete_api_key(&self, provider: LLMProvider) -> Result<()> {
        self.keyring.delete_secret(provider.keyring_account())
    }

    /// Config value first, then the provider's conventional env var, then the keyring.
    pub fn resolve_api_key(&self, config: &mut LLMConfig) {
        if config.api_key.as_deref().map_or(false, |k| !k.trim().is_empty()) {
            return;
        }

        if let Some(key) = provider_env_var(config.provider)
            .and_then(|name| std::env::var(name).ok())
            .filter(|k| !k.trim().is_empty())
        {
            config.api_key = Some(key);
            return;
        }

        match self.get_api_key(config.provider) {
            Ok(key) => config.api_key = Some(key),
            Err(err) => debug!(error = %err, "No API key in keyring"),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

fn provider_env_var(provider: LLMProvider) -> Option<&'static str> {
    match provider {
        LLMProvider::Local => None,
        LLMProvider::OpenAI => Some("OPENAI_API_KEY"),
        LLMProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
        LLMProvider::Google => Some("GEMINI_API_KEY"),
    }
}
