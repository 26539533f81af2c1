//! Explicit transition table for the call lifecycle.
//!
//! Every inbound webhook event is checked against this table before any
//! session mutation. An event that is not valid for the call's current state
//! is rejected with `InvalidTransition` instead of being absorbed by
//! field-level defaults.

use ringdesk_types::CallState;

/// The class of an inbound webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `call-start`. Valid only when no session exists yet; session creation
    /// itself enforces this, so the table never sees it against a live state.
    Start,
    /// A DTMF digit from the language menu.
    Dtmf,
    /// A recognized speech turn.
    Speech,
    /// `call-end`.
    End,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "call_start",
            Self::Dtmf => "dtmf_input",
            Self::Speech => "speech_input",
            Self::End => "call_end",
        }
    }
}

/// Returns whether `event` may be processed while the call is in `state`.
///
/// Invalid DTMF digits keep the call in `LanguagePending`, so the menu row
/// accepts repeated digits. `End` is accepted from every live state: the
/// telephony provider may hang up at any point, including mid-menu and after
/// a blind transfer.
pub fn transition_allowed(state: CallState, event: EventKind) -> bool {
    match event {
        EventKind::Start => false,
        EventKind::Dtmf => matches!(state, CallState::Started | CallState::LanguagePending),
        EventKind::Speech => state == CallState::AiConversation,
        EventKind::End => state != CallState::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_only_during_ai_conversation() {
        assert!(transition_allowed(CallState::AiConversation, EventKind::Speech));
        for state in [
            CallState::Started,
            CallState::LanguagePending,
            CallState::HumanTransferred,
            CallState::Completed,
        ] {
            assert!(!transition_allowed(state, EventKind::Speech), "{state}");
        }
    }

    #[test]
    fn dtmf_only_while_menu_is_open() {
        assert!(transition_allowed(CallState::Started, EventKind::Dtmf));
        assert!(transition_allowed(CallState::LanguagePending, EventKind::Dtmf));
        assert!(!transition_allowed(CallState::AiConversation, EventKind::Dtmf));
        assert!(!transition_allowed(CallState::Completed, EventKind::Dtmf));
    }

    #[test]
    fn end_accepted_from_every_live_state() {
        for state in [
            CallState::Started,
            CallState::LanguagePending,
            CallState::AiConversation,
            CallState::HumanTransferred,
        ] {
            assert!(transition_allowed(state, EventKind::End), "{state}");
        }
        assert!(!transition_allowed(CallState::Completed, EventKind::End));
    }

    #[test]
    fn start_never_valid_against_an_existing_session() {
        for state in [
            CallState::Started,
            CallState::LanguagePending,
            CallState::AiConversation,
            CallState::HumanTransferred,
            CallState::Completed,
        ] {
            assert!(!transition_allowed(state, EventKind::Start));
        }
    }
}
