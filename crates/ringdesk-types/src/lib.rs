//! Shared types for the Ringdesk platform.
//!
//! Defines the call-session data model used across every crate: spoken
//! language, handling party, call outcome, lifecycle state, and transcript
//! turns. Enum labels are the canonical wire strings exchanged with the
//! telephony provider and stored in the database.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing an unknown enum label.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} label: {value}")]
pub struct ParseLabelError {
    /// The enum kind that failed to parse (e.g. "language").
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

macro_rules! labeled_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $label)] $variant, )+
        }

        impl $name {
            /// Returns the canonical string label for this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $label => Ok(Self::$variant), )+
                    _ => Err(ParseLabelError { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

labeled_enum!(
    /// The caller's selected spoken language.
    Language, "language", {
        /// Russian, handled by the dialogue engine.
        Ru => "RU",
        /// Uzbek, handed to a human operator.
        Uz => "UZ",
    }
);

labeled_enum!(
    /// Which party is driving the conversation for a call.
    HandledBy, "handled_by", {
        /// The automated dialogue engine.
        Ai => "AI",
        /// A human operator (blind transfer).
        Human => "HUMAN",
    }
);

labeled_enum!(
    /// The final classification of a call.
    ///
    /// Starts at `Info` and moves monotonically toward a more specific value
    /// during the call; the call-end rule may force `Missed` (see the
    /// orchestrator's outcome classifier).
    Outcome, "outcome", {
        /// General information request.
        Info => "info",
        /// A booking intent was detected in the conversation.
        Booking => "booking",
        /// The call was too short or never answered.
        Missed => "missed",
        /// The caller was transferred to a human operator.
        Transfer => "transfer",
    }
);

labeled_enum!(
    /// Coarse session status.
    CallStatus, "status", {
        Active => "active",
        Completed => "completed",
    }
);

labeled_enum!(
    /// Explicit lifecycle state of a call.
    ///
    /// Every webhook event is validated against a transition table on this
    /// state; events that are invalid for the current state are rejected.
    CallState, "state", {
        /// The language menu has been offered.
        Started => "started",
        /// Waiting for a DTMF digit.
        LanguagePending => "language_pending",
        /// AI-handled conversation loop (Russian).
        AiConversation => "ai_conversation",
        /// Blind-transferred to a human operator; terminal for this system.
        HumanTransferred => "human_transferred",
        /// The call has ended.
        Completed => "completed",
    }
);

labeled_enum!(
    /// The author of a transcript turn.
    TurnRole, "role", {
        User => "user",
        Assistant => "assistant",
    }
);

/// One call session, keyed by the externally supplied call identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallSession {
    /// Internal database row ID.
    pub id: i64,
    /// Externally supplied call identifier. Unique, immutable.
    pub call_id: String,
    /// Free-form caller number, when the provider supplies one.
    pub caller_number: Option<String>,
    /// Selected spoken language. Defaults to Russian until selection.
    pub language: Language,
    /// Which party handles the conversation. Defaults to the AI.
    pub handled_by: HandledBy,
    /// The accumulated call outcome.
    pub outcome: Outcome,
    /// Coarse session status.
    pub status: CallStatus,
    /// Explicit lifecycle state.
    pub state: CallState,
    /// Total call duration, set at completion.
    pub call_duration_seconds: Option<i64>,
    /// Whether downstream channels were notified for this call.
    pub notified: bool,
    /// When notification dispatch settled (ISO 8601).
    pub notified_at: Option<String>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Last mutation timestamp (ISO 8601).
    pub updated_at: String,
}

/// One turn in a call's conversation transcript.
///
/// Turns are append-only and ordered by `turn_index`; the ordered sequence is
/// the dialogue-engine context, so it is never reordered or mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptTurn {
    /// Internal database row ID.
    pub id: i64,
    /// The call this turn belongs to.
    pub call_id: String,
    /// Zero-based position within the call's transcript.
    pub turn_index: i64,
    /// Who authored the turn.
    pub role: TurnRole,
    /// The utterance text.
    pub content: String,
    /// When the turn was appended (ISO 8601).
    pub created_at: String,
}
