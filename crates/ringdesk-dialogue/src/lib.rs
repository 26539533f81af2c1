//! Dialogue Engine for the Ringdesk platform.
//!
//! Generates the next assistant utterance for an AI-handled call under a
//! fixed safety policy, independent of which underlying language-model
//! provider is configured.
//!
//! Exactly one provider is active per process, resolved once at startup from
//! configuration in a fixed priority order (OpenAI, then Gemini, then Groq)
//! and injected into the engine; provider selection is never re-derived per
//! call.
//!
//! Every completion request prepends a non-negotiable system instruction, and
//! every reply passes through a post-hoc safety filter that runs regardless
//! of what the prompt already forbids. Upstream faults of any kind surface as
//! a structured `DialogueResult` with `success: false`.

mod config;
mod error;
mod prompt;
mod provider;
mod safety;

pub use config::{DialogueConfig, ProviderKind};
pub use error::DialogueError;
pub use prompt::{build_messages, ChatMessage, SYSTEM_INSTRUCTION};
pub use provider::ProviderClient;
pub use safety::{default_rules, ContentRule, FilterVerdict, SafetyFilter, OPERATOR_REDIRECT};

use ringdesk_types::TranscriptTurn;

/// Structured outcome of one dialogue turn.
#[derive(Debug, Clone)]
pub struct DialogueResult {
    pub success: bool,
    /// The assistant reply after safety filtering, present only on success.
    pub text: Option<String>,
    /// Whether the safety filter replaced the model's reply.
    pub filtered: bool,
    /// Failure description, present only on failure.
    pub error: Option<String>,
}

/// The dialogue engine: one resolved provider plus the safety policy.
#[derive(Debug)]
pub struct DialogueEngine {
    provider: ProviderClient,
    filter: SafetyFilter,
    max_context_turns: usize,
}

impl DialogueEngine {
    /// Builds the engine from configuration, resolving the provider once.
    ///
    /// # Errors
    ///
    /// Returns `DialogueError::NoProvider` when no credential set is present.
    pub fn from_config(config: &DialogueConfig) -> Result<Self, DialogueError> {
        let provider = ProviderClient::resolve(config)?;
        tracing::info!(provider = provider.kind().as_str(), "dialogue provider resolved");

        Ok(Self {
            provider,
            filter: SafetyFilter::with_default_rules(),
            max_context_turns: config.max_context_turns,
        })
    }

    /// Replaces the safety filter (used to unit-test policy independently).
    pub fn with_filter(mut self, filter: SafetyFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Generates the next assistant utterance for the given transcript.
    ///
    /// `transcript` is the call's full ordered transcript including the just
    /// appended user turn; only the last N turns are sent as context to bound
    /// prompt size. Never returns `Err`: upstream faults fold into the
    /// result.
    pub async fn reply(&self, transcript: &[TranscriptTurn]) -> DialogueResult {
        let messages = build_messages(transcript, self.max_context_turns);

        let raw = match self.provider.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "dialogue provider call failed");
                return DialogueResult {
                    success: false,
                    text: None,
                    filtered: false,
                    error: Some(e.to_string()),
                };
            }
        };

        // Second line of defense: the filter runs on every reply even though
        // the system instruction already forbids this content.
        let verdict = self.filter.apply(&raw);
        if let Some(rule) = &verdict.matched_rule {
            tracing::warn!(rule = rule.as_str(), "safety filter replaced model reply");
        }

        DialogueResult {
            success: true,
            filtered: verdict.matched_rule.is_some(),
            text: Some(verdict.text),
            error: None,
        }
    }
}
