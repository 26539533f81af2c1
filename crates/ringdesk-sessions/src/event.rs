//! Event payloads and records for the per-call audit log.

use ringdesk_types::{HandledBy, Language, Outcome};
use serde::{Deserialize, Serialize};

/// Structured payloads for each call event type.
///
/// Payloads are serialized to JSON and stored in the `payload_json` column of
/// `call_event_log`. Each variant corresponds to an `event_type` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CallEventPayload {
    /// The telephony provider reported a new call.
    Start {
        /// Caller number as supplied by the provider, if any.
        caller_number: Option<String>,
    },

    /// A DTMF digit was received (valid or not).
    DtmfInput {
        /// The digit the caller pressed.
        digit: String,
        /// Whether the digit matched a menu option.
        accepted: bool,
    },

    /// The caller picked a language from the menu.
    LanguageSelected {
        language: Language,
        handled_by: HandledBy,
    },

    /// A caller utterance was transcribed and appended to the transcript.
    UserSpeech {
        /// The recognized text.
        text: String,
    },

    /// The dialogue engine produced an assistant reply.
    AiResponse {
        /// The reply text after safety filtering.
        text: String,
        /// Whether the safety filter replaced the model's reply.
        filtered: bool,
    },

    /// Speech-to-text failed or returned no text; the call continued with a
    /// scripted re-prompt.
    SttError { error: String },

    /// The dialogue engine failed; the call continued with a scripted
    /// apology.
    LlmError { error: String },

    /// The call ended.
    End {
        end_reason: Option<String>,
        duration_seconds: i64,
        outcome: Outcome,
    },
}

impl CallEventPayload {
    /// Returns the canonical event type string for this payload.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::DtmfInput { .. } => "dtmf_input",
            Self::LanguageSelected { .. } => "language_selected",
            Self::UserSpeech { .. } => "user_speech",
            Self::AiResponse { .. } => "ai_response",
            Self::SttError { .. } => "stt_error",
            Self::LlmError { .. } => "llm_error",
            Self::End { .. } => "end",
        }
    }
}

/// A single row from the `call_event_log` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    /// Auto-incremented row ID.
    pub id: i64,
    /// The call this event belongs to.
    pub call_id: String,
    /// Monotonically increasing sequence number within the call.
    pub seq: i64,
    /// The event type (e.g. `start`, `user_speech`).
    pub event_type: String,
    /// The structured payload as a JSON string.
    pub payload_json: String,
    /// ISO 8601 timestamp of when the event was written.
    pub occurred_at: String,
}

/// Filter criteria for querying a call's event log.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Filter by event type string.
    pub event_type: Option<String>,
    /// Return events that occurred at or after this ISO 8601 timestamp.
    pub since: Option<String>,
    /// Maximum number of events to return (default: 100).
    pub limit: Option<i64>,
}
