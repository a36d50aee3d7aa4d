//! LLM provider abstraction layer.
//!
//! A trait-based seam over chat-style backends; all implementations share the
//! validation and fallback pipeline in the namer.

mod anthropic;
mod openai;
mod provider;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::{CompletionOptions, LlmError, LlmProvider};
