//! OpenAI Chat Completions API.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MergerError, Result};

use super::prompts;
use super::provider::{LlmConfig, LlmProvider, api_key_from_env, ensure_success, http_client};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const KEY_VAR: &str = "OPENAI_API_KEY";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    config: LlmConfig,
}

impl OpenAIProvider {
    /// `gpt-4o` with default limits.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, LlmConfig::default().with_model(DEFAULT_MODEL))
    }

    pub fn with_config(api_key: impl Into<String>, config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            api_key: api_key.into(),
            config,
        })
    }

    /// Key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env(KEY_VAR)?)
    }

    pub fn from_env_with_config(config: LlmConfig) -> Result<Self> {
        Self::with_config(api_key_from_env(KEY_VAR)?, config)
    }

    fn request<'a>(&'a self, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: prompts::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        }
    }
}

impl LlmProvider for OpenAIProvider {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.config.model, prompt_len = prompt.len(), "sending OpenAI request");

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .map_err(|e| MergerError::Llm(format!("OpenAI request failed: {}", e)))?;

        let reply: CompletionResponse = ensure_success(response, "OpenAI")?
            .json()
            .map_err(|e| MergerError::Llm(format!("Unexpected OpenAI response: {}", e)))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MergerError::Llm("OpenAI reply has no message content".to_string()))
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f64,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

// `content` is null when the model refuses or calls a tool.
#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "{}"}}]}"#;
        let reply: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("{}"));

        let refused = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let reply: CompletionResponse = serde_json::from_str(refused).unwrap();
        assert!(reply.choices[0].message.content.is_none());
    }

    #[test]
    fn test_default_model() {
        let provider = OpenAIProvider::new("sk-test").unwrap();
        assert_eq!(provider.config().model, "gpt-4o");
        assert_eq!(provider.name(), "openai");
        let body = serde_json::to_value(provider.request("hi")).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
    }
}
