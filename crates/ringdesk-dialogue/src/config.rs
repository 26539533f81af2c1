//! Dialogue engine configuration and provider selection.

use serde::Deserialize;

use crate::error::DialogueError;

/// The language-model providers the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Groq,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }
}

/// Configuration for the dialogue engine.
///
/// Exactly one provider becomes active: the first of OpenAI, Gemini, Groq
/// whose API key is present. Resolution happens once at process start.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DialogueConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,

    /// Model name override; each provider has a sensible default.
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override for OpenAI-compatible providers (self-hosted
    /// gateways).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many trailing transcript turns are sent as context.
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_context_turns() -> usize {
    20
}

impl DialogueConfig {
    /// Picks the active provider in fixed priority order.
    ///
    /// # Errors
    ///
    /// Returns `DialogueError::NoProvider` when no key is configured.
    pub fn resolve_provider(&self) -> Result<(ProviderKind, String), DialogueError> {
        if let Some(key) = non_empty(&self.openai_api_key) {
            return Ok((ProviderKind::OpenAi, key));
        }
        if let Some(key) = non_empty(&self.gemini_api_key) {
            return Ok((ProviderKind::Gemini, key));
        }
        if let Some(key) = non_empty(&self.groq_api_key) {
            return Ok((ProviderKind::Groq, key));
        }
        Err(DialogueError::NoProvider)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
