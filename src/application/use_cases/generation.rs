use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use tracing::{debug, info};

/// Instructions sent with every prompt so the backend answers in the wire
/// format the response parser accepts.
pub const TABULAR_SYSTEM_PROMPT: &str = "You generate tab-separated values (TSV). \
Follow the user's instructions and answer with a table only. \
The first line is the header row; every following line is one data row. \
Separate cells with a single TAB character and use exactly the columns the instructions name. \
Do not use code blocks, markdown, or any commentary. \
Inside a cell write a tab as \\t, a line break as \\n and a backslash as \\\\.";

/// One bounded round trip to the configured backend. Never retries.
pub struct GenerationClient {
    llm_client: Arc<dyn LLMClient>,
    config: LLMConfig,
}

impl GenerationClient {
    pub fn new(llm_client: Arc<dyn LLMClient>, config: LLMConfig) -> Self {
        Self { llm_client, config }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    pub async fn generate(&self, prompt_text: &str) -> Result<String> {
        debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_chars = prompt_text.chars().count(),
            "Sending prompt"
        );

        let started = std::time::Instant::now();
        let call = self
            .llm_client
            .generate(&self.config, TABULAR_SYSTEM_PROMPT, prompt_text);

        let raw = tokio::time::timeout(self.config.timeout(), call)
            .await
            .map_err(|_| AppError::GenerationTimeout(self.config.timeout_secs))??;

        info!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_chars = raw.chars().count(),
            "Generation finished"
        );

        Ok(raw)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend double that replays scripted replies and records prompts.
    pub struct ScriptedClient {
        replies: Mutex<Vec<Result<String>>>,
        delay: Option<Duration>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub fn replying(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(AppError::GenerationUnavailable("no scripted reply".to_string()));
            }
            replies.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedClient;
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_generate_passes_prompt_through() {
        let backend = Arc::new(ScriptedClient::replying(vec![Ok("A\tB".to_string())]));
        let client = GenerationClient::new(backend.clone(), LLMConfig::default());

        let raw = client.generate("Report for Japan").await.unwrap();
        assert_eq!(raw, "A\tB");
        assert_eq!(backend.prompts.lock().unwrap().as_slice(), ["Report for Japan"]);
    }

    #[tokio::test]
    async fn test_backend_error_is_surfaced_unchanged() {
        let backend = Arc::new(ScriptedClient::replying(vec![Err(
            AppError::GenerationUnavailable("connection refused".to_string()),
        )]));
        let client = GenerationClient::new(backend, LLMConfig::default());

        let err = client.generate("prompt").await.unwrap_err();
        assert!(err.is_generation_failure());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let backend = Arc::new(
            ScriptedClient::replying(vec![Ok("late".to_string())])
                .with_delay(Duration::from_secs(10)),
        );
        let config = LLMConfig {
            timeout_secs: 1,
            ..LLMConfig::default()
        };
        let client = GenerationClient::new(backend, config);

        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, AppError::GenerationTimeout(1)));
    }

    #[test]
    fn test_system_prompt_documents_escapes() {
        assert!(TABULAR_SYSTEM_PROMPT.contains("\\t"));
        assert!(TABULAR_SYSTEM_PROMPT.contains("\\n"));
    }
}
