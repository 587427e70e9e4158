//! The provider seam and the HTTP plumbing its adapters share.

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::{MergerError, Result};

/// Configuration for LLM providers.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model to use (e.g., "claude-sonnet-4-20250514").
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation (0.0-1.0).
    pub temperature: f64,

    /// HTTP timeout for a single call, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the response token limit.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Blocking client honouring the configured timeout.
pub(super) fn http_client(config: &LlmConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| MergerError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Read a credential; its format is left to the service to judge.
pub(super) fn api_key_from_env(var: &str) -> Result<String> {
    std::env::var(var)
        .map_err(|_| MergerError::Config(format!("{} environment variable not set", var)))
}

/// Turn a non-2xx reply into an `Llm` error carrying the response body.
pub(super) fn ensure_success(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(MergerError::Llm(format!("{} returned {}: {}", service, status, body)))
}

/// Trait for LLM providers.
///
/// The merge engine only needs "prompt text in, response text out"; each
/// provider hides its own request shape (single completion, message list,
/// local server) behind [`LlmProvider::generate`].
///
/// Implementations must be thread-safe (Send + Sync) so one provider can
/// serve every merge operation of a manager.
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and return the raw response text.
    ///
    /// Timeouts and length limits of the underlying service surface here as
    /// ordinary errors.
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the configuration for this provider.
    fn config(&self) -> &LlmConfig;

    /// Get the name of this provider (for logging/debugging).
    fn name(&self) -> &str;
}
