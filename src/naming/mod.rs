//! LLM-backed era naming: prompt construction, bounded retries, response
//! validation and deterministic fallbacks.

pub mod llm;
mod namer;
mod prompt;

pub use namer::{fallback_name, EraName, EraNamer, NamerConfig};
pub use prompt::{build_era_prompt, format_duration};
