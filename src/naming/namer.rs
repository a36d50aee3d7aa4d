//! Era naming through an LLM, with strict response validation and
//! deterministic fallbacks.

use super::llm::{CompletionOptions, LlmError, LlmProvider};
use super::prompt::{build_era_prompt, format_duration};
use crate::models::Era;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_TITLE_CHARS: usize = 50;
const MIN_SUMMARY_CHARS: usize = 20;
const MAX_SUMMARY_CHARS: usize = 500;

/// The naming stage advances percent through this band.
const NAMING_BAND_START: usize = 40;
const NAMING_BAND_END: usize = 70;

#[derive(Debug, Clone, PartialEq)]
pub struct EraName {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct NamerConfig {
    pub options: CompletionOptions,
    /// Attempts per era, counting the first call.
    pub max_attempts: u32,
    /// First retry sleeps this long; later retries double it.
    pub base_backoff: Duration,
}

impl Default for NamerConfig {
    fn default() -> Self {
        Self {
            options: CompletionOptions::default(),
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Names eras through a provider; without one, every era gets the
/// deterministic fallback.
pub struct EraNamer {
    provider: Option<Arc<dyn LlmProvider>>,
    config: NamerConfig,
}

impl EraNamer {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, config: NamerConfig) -> Self {
        Self { provider, config }
    }

    pub fn disabled() -> Self {
        Self::new(None, NamerConfig::default())
    }

    /// Produce a title and summary for one era. Total: any provider failure
    /// or unusable response degrades to the fallback.
    pub async fn name_era(&self, era: &Era) -> EraName {
        let provider = match &self.provider {
            Some(provider) => provider,
            None => return fallback_name(era),
        };

        match self.request_name(provider.as_ref(), era).await {
            Ok(name) => name,
            Err(err) => {
                warn!(era = era.id, "LLM naming failed, using fallback: {}", err);
                fallback_name(era)
            }
        }
    }

    async fn request_name(
        &self,
        provider: &dyn LlmProvider,
        era: &Era,
    ) -> Result<EraName, LlmError> {
        let prompt = build_era_prompt(era);
        let mut attempt: u32 = 0;

        loop {
            match provider.complete(&prompt, &self.config.options).await {
                Ok(content) => {
                    return Ok(parse_response(&content)
                        .and_then(clean_candidate)
                        .unwrap_or_else(|| fallback_name(era)));
                }
                Err(err) => {
                    attempt += 1;
                    if !err.is_retryable() || attempt >= self.config.max_attempts {
                        return Err(err);
                    }
                    let backoff = self.config.base_backoff * 2u32.pow(attempt - 1);
                    debug!(era = era.id, attempt, "Retrying LLM call after error: {}", err);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Name every era sequentially. Progress is reported after each era,
    /// mapped linearly into the naming band; it never decreases.
    pub async fn name_all_eras(&self, eras: &mut [Era], mut on_progress: impl FnMut(u8)) {
        let total = eras.len();
        for (index, era) in eras.iter_mut().enumerate() {
            let name = self.name_era(era).await;
            era.title = name.title;
            era.summary = name.summary;

            let done = index + 1;
            let percent =
                NAMING_BAND_START + (done * (NAMING_BAND_END - NAMING_BAND_START)) / total;
            on_progress(percent as u8);
        }
    }
}

/// Deterministic name derived from the era alone; never fails.
pub fn fallback_name(era: &Era) -> EraName {
    let title = truncate_chars(
        &format!("Era {}: {}", era.id, era.start_date.format("%B %Y")),
        MAX_TITLE_CHARS,
    );

    let days = (era.end_date - era.start_date).num_days() + 1;
    let duration = format_duration(days);
    let summary = match era.top_artists.first() {
        Some(top) => format!("A {} period featuring {} and more.", duration, top.name),
        None => format!("A {} period of varied listening.", duration),
    };

    EraName {
        title,
        summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
    }
}

#[derive(Debug, Deserialize)]
struct RawName {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
}

/// Strict JSON first, then the outermost brace-delimited substring.
fn parse_response(content: &str) -> Option<RawName> {
    if let Ok(name) = serde_json::from_str::<RawName>(content) {
        return Some(name);
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

fn clean_candidate(raw: RawName) -> Option<EraName> {
    let title = clean_title(&raw.title)?;
    let summary = clean_summary(&raw.summary)?;
    Some(EraName { title, summary })
}

fn clean_title(raw: &str) -> Option<String> {
    let dequoted = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let flat = dequoted.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.is_empty() {
        return None;
    }
    Some(truncate_chars(&flat, MAX_TITLE_CHARS))
}

fn clean_summary(raw: &str) -> Option<String> {
    let dequoted = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let collapsed = dequoted.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() < MIN_SUMMARY_CHARS {
        return None;
    }
    Some(truncate_chars(&collapsed, MAX_SUMMARY_CHARS))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim_end().to_string()
}
