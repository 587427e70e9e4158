//! LLM provider integration for mapping and transformation suggestions.
//!
//! The merge engine talks to language models only through the
//! [`LlmProvider`] trait: a prompt goes in, raw completion text comes out.
//! Parsing that text into typed suggestions is the job of
//! [`crate::suggest::StructuredParser`].
//!
//! # Supported Providers
//!
//! - **Anthropic** - Claude models via API (requires `ANTHROPIC_API_KEY`)
//! - **OpenAI** - GPT models via API (requires `OPENAI_API_KEY`)
//! - **Ollama** - Local models, no API key needed (requires Ollama installed)
//! - **Mock** - Scripted responses for tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use table_merger::{OllamaProvider, TableMergerManager};
//!
//! // Use a free local model
//! let manager = TableMergerManager::new(Arc::new(OllamaProvider::new().unwrap()));
//! ```

mod anthropic;
mod mock;
mod ollama;
mod openai;
pub mod prompts;
mod provider;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use provider::{LlmConfig, LlmProvider};
