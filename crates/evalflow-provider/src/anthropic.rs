use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info};

use crate::{generation_payload, GeneratorConfig, ProviderError, TextGenerationProvider};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Text generation through the Anthropic Messages API
pub struct AnthropicGenerator {
    api_key: SecretString,
    base_url: String,
    config: GeneratorConfig,
    client: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(api_key: SecretString, config: GeneratorConfig) -> Result<Self, ProviderError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string());

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    fn request_body(&self, prompt: &str, context: &str) -> Value {
        serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": generation_payload(prompt, context)
                }
            ]
        })
    }
}

/// Pull the first text block out of a Messages API response
fn extract_text(body: &Value) -> Result<String, ProviderError> {
    body["content"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse("Missing content[0].text".to_string()))
}

#[async_trait]
impl TextGenerationProvider for AnthropicGenerator {
    fn name(&self) -> &str {
        "Anthropic API"
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, ProviderError> {
        debug!(model = %self.config.model, "Sending request to Anthropic");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret().as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(prompt, context))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let text = extract_text(&body)?;
        info!(chars = text.chars().count(), "Received generation from Anthropic");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> AnthropicGenerator {
        let config = GeneratorConfig::new("claude-test").with_max_tokens(64);
        AnthropicGenerator::new(SecretString::new("sk-test".to_string()), config).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = generator().request_body("Summarize X", "ctx");
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(
            body["messages"][0]["content"],
            "Leverage the context:ctx to execute the following prompt:Summarize X"
        );
    }

    #[test]
    fn test_base_url_defaults_and_trims() {
        assert_eq!(generator().base_url, ANTHROPIC_BASE_URL);

        let config = GeneratorConfig::default().with_base_url("http://localhost:9000/v1/");
        let custom =
            AnthropicGenerator::new(SecretString::new("k".to_string()), config).unwrap();
        assert_eq!(custom.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn test_extract_text() {
        let body = serde_json::json!({"content": [{"type": "text", "text": "X is ..."}]});
        assert_eq!(extract_text(&body).unwrap(), "X is ...");

        let missing = serde_json::json!({"content": []});
        assert!(matches!(
            extract_text(&missing),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
