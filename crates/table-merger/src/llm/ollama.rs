//! Local models served by Ollama; no API key involved.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MergerError, Result};

use super::prompts;
use super::provider::{LlmConfig, LlmProvider, http_client};

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";

/// Chat endpoint of an Ollama server, `OLLAMA_HOST` or localhost.
pub struct OllamaProvider {
    client: Client,
    chat_url: String,
    config: LlmConfig,
}

impl OllamaProvider {
    /// `llama3.2` on the configured host.
    pub fn new() -> Result<Self> {
        Self::with_model(DEFAULT_MODEL)
    }

    /// A pulled model by name; local generation gets a longer timeout.
    pub fn with_model(model: impl Into<String>) -> Result<Self> {
        let config = LlmConfig {
            timeout_secs: 120,
            ..LlmConfig::default()
        }
        .with_model(model);
        Self::with_config(config)
    }

    pub fn with_config(config: LlmConfig) -> Result<Self> {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::with_host(host, config)
    }

    /// Talk to a server at `host` (e.g. `http://gpu-box:11434`).
    pub fn with_host(host: impl AsRef<str>, config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            chat_url: chat_url(host.as_ref()),
            config,
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            stream: false,
            format: "json",
            options: ChatOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
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

fn chat_url(host: &str) -> String {
    format!("{}/api/chat", host.trim().trim_end_matches('/'))
}

impl LlmProvider for OllamaProvider {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            model = %self.config.model,
            url = %self.chat_url,
            prompt_len = prompt.len(),
            "sending Ollama request"
        );

        let response = self
            .client
            .post(&self.chat_url)
            .json(&self.request(prompt))
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    MergerError::Llm(format!(
                        "Cannot reach Ollama at {} (is `ollama serve` running?)",
                        self.chat_url
                    ))
                } else {
                    MergerError::Llm(format!("Ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(if body.contains("not found") {
                MergerError::Llm(format!(
                    "Ollama has no model '{}'; run `ollama pull {}`",
                    self.config.model, self.config.model
                ))
            } else {
                MergerError::Llm(format!("Ollama returned {}: {}", status, body))
            });
        }

        let reply: ChatResponse = response
            .json()
            .map_err(|e| MergerError::Llm(format!("Unexpected Ollama response: {}", e)))?;
        Ok(reply.message.content)
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    format: &'a str,
    options: ChatOptions,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}
