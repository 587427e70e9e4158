//! Mock LLM provider for testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{MergerError, Result};

use super::provider::{LlmConfig, LlmProvider};

/// Mock LLM provider that replays a fixed script of responses.
///
/// Each call to [`LlmProvider::generate`] pops the next scripted response
/// and records the prompt it was given. Once the script runs out every call
/// fails with [`MergerError::Llm`].
pub struct MockProvider {
    config: LlmConfig,
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::with_config(LlmConfig::default().with_model("mock"))
    }

    /// Create with custom configuration.
    pub fn with_config(config: LlmConfig) -> Self {
        Self {
            config,
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers with `responses`, in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Append one response to the end of the script.
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response.into());
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Number of `generate` calls made.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Responses still waiting in the script.
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for MockProvider {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .map_err(|_| MergerError::Llm("mock prompt log poisoned".to_string()))?
            .push(prompt.to_string());

        self.responses
            .lock()
            .map_err(|_| MergerError::Llm("mock script poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| MergerError::Llm("mock provider has no scripted response left".to_string()))
    }

    fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replays_script_in_order() {
        let mock = MockProvider::with_responses(["first", "second"]);

        assert_eq!(mock.generate("a").unwrap(), "first");
        assert_eq!(mock.generate("b").unwrap(), "second");
        assert_eq!(mock.prompts(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(mock.remaining(), 0);
    }

    #[test]
    fn test_exhausted_script_is_an_error() {
        let mock = MockProvider::new();
        let err = mock.generate("anything").unwrap_err();

        assert!(matches!(err, MergerError::Llm(_)));
        assert_eq!(mock.call_count(), 1);
    }
}
