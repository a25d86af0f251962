use super::{map_transport_error, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::json;

/// Chat-completions transport for OpenAI and API-compatible servers
/// (OpenRouter, LM Studio, llama.cpp).
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(config: &LLMConfig) -> String {
        if config.base_url.ends_with('/') {
            format!("{}chat/completions", config.base_url)
        } else {
            format!("{}/chat/completions", config.base_url)
        }
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let mut body = json!({
            "model": config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
        });
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = config.temperature {
            body["temperature"] = json!(temperature);
        }

        let mut request = self
            .client
            .post(Self::endpoint(config))
            .timeout(config.timeout())
            .json(&body);

        match config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => request = request.bearer_auth(key),
            _ if config.provider.requires_api_key() => {
                return Err(AppError::GenerationUnavailable(format!(
                    "Missing API key for {:?}",
                    config.provider
                )))
            }
            _ => {}
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(e, config))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationUnavailable(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| map_transport_error(e, config))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AppError::GenerationUnavailable("Response carried no message content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LLMConfig {
        LLMConfig {
            provider: LLMProvider::OpenAI,
            base_url: format!("{}/v1", server.uri()),
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            max_tokens: None,
            temperature: Some(0.0),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_generate_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "A\tB\n1\t2" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAIClient::new();
        let text = client
            .generate(&config_for(&server), "system", "user")
            .await
            .unwrap();
        assert_eq!(text, "A\tB\n1\t2");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = OpenAIClient::new()
            .generate(&config_for(&server), "system", "user")
            .await
            .unwrap_err();
        match err {
            AppError::GenerationUnavailable(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(3))
                    .set_body_json(json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.timeout_secs = 1;

        let err = OpenAIClient::new()
            .generate(&config, "system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationTimeout(1)));
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected_before_sending() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.api_key = None;

        let err = OpenAIClient::new()
            .generate(&config, "system", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationUnavailable(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
