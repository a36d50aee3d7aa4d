//! Environment-driven configuration read once at startup.
//!
//! Operational knobs come from the CLI; LLM and CORS settings come from the
//! environment. A missing API credential is not a startup error: the
//! provider is still built and the first call fails with an auth error.

use crate::naming::llm::{AnthropicProvider, LlmProvider, OpenAiProvider};
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
    /// Naming is skipped entirely; every era gets the fallback name.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub kind: LlmProviderKind,
    pub model: String,
    pub timeout: Duration,
}

impl LlmSettings {
    /// Read `LLM_PROVIDER`, `LLM_MODEL` and `LLM_TIMEOUT` (seconds).
    pub fn from_env() -> Result<Self> {
        let provider = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let kind = match provider.as_str() {
            "openai" => LlmProviderKind::OpenAi,
            "anthropic" => LlmProviderKind::Anthropic,
            "none" => LlmProviderKind::Disabled,
            other => bail!("Unknown LLM provider: {}", other),
        };

        let model = std::env::var("LLM_MODEL")
            .ok()
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| match kind {
                LlmProviderKind::Anthropic => DEFAULT_ANTHROPIC_MODEL.to_string(),
                _ => DEFAULT_OPENAI_MODEL.to_string(),
            });

        let timeout_secs = std::env::var("LLM_TIMEOUT")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(30);

        Ok(Self {
            kind,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Build the configured provider, reading its credential from the
    /// environment. `None` means naming is disabled.
    pub fn build_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        match self.kind {
            LlmProviderKind::OpenAi => Some(Arc::new(OpenAiProvider::new(
                self.model.clone(),
                std::env::var("OPENAI_API_KEY").ok(),
            ))),
            LlmProviderKind::Anthropic => Some(Arc::new(AnthropicProvider::new(
                self.model.clone(),
                std::env::var("ANTHROPIC_API_KEY").ok(),
            ))),
            LlmProviderKind::Disabled => None,
        }
    }
}

/// `ALLOWED_ORIGINS` is a comma separated origin list; `*` allows any.
pub fn allowed_origins_from_env() -> Vec<String> {
    parse_origins(&std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()))
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
