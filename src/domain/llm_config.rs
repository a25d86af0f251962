use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use super::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    /// OpenAI-compatible server on the local machine (LM Studio, llama.cpp, ...).
    Local,
    OpenAI,
    OpenRouter,
    Google,
}

impl LLMProvider {
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Local)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LLMProvider::Local => "http://localhost:1234/v1",
            LLMProvider::OpenAI => "https://api.openai.com/v1",
            LLMProvider::OpenRouter => "https://openrouter.ai/api/v1",
            LLMProvider::Google => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Keyring account under which the provider's key is stored.
    pub fn keyring_account(&self) -> &'static str {
        match self {
            LLMProvider::Local => "local",
            LLMProvider::OpenAI => "openai",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Google => "google",
        }
    }
}

impl FromStr for LLMProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(LLMProvider::Local),
            "openai" => Ok(LLMProvider::OpenAI),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "google" | "gemini" => Ok(LLMProvider::Google),
            other => Err(AppError::ValidationError(format!(
                "Unknown LLM provider: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Upper bound for one generation round trip.
    pub timeout_secs: u64,
}

impl LLMConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: LLMProvider::OpenAI.default_base_url().to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            timeout_secs: 120,
        }
    }
}
