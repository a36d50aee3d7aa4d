//! LLM provider trait definition.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Options for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Temperature for sampling.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 300,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Transient failures worth another attempt. Auth failures and client
    /// errors are authoritative and never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::Timeout | LlmError::RateLimited => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::Auth(_) | LlmError::InvalidResponse(_) => false,
        }
    }
}

/// Trait for LLM providers.
///
/// Implementations connect to different chat-completion backends while
/// providing a unified single-prompt interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider's name (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Complete a single user prompt, returning the raw text content.
    async fn complete(&self, prompt: &str, options: &CompletionOptions)
        -> Result<String, LlmError>;
}
