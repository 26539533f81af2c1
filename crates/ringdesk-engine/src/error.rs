use ringdesk_sessions::SessionError;
use ringdesk_types::CallState;
use thiserror::Error;

/// Errors surfaced by the call orchestrator.
///
/// Only validation-class errors (`Validation`, `NotFound`,
/// `InvalidTransition`, `RateLimited`) reach the telephony provider as error
/// payloads. Upstream speech/dialogue failures are handled inside the speech
/// turn protocol and never appear here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or malformed required field. No session mutation occurred.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced call has no session.
    #[error("call session not found: {0}")]
    NotFound(String),

    /// The event is not valid for the call's current state.
    #[error("event {event} is not valid in state {state}")]
    InvalidTransition {
        state: CallState,
        event: &'static str,
    },

    /// The per-call rate limiter denied a speech turn.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Unexpected fault. The failing step's effects are not partially
    /// applied.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for EngineError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => Self::NotFound(id),
            SessionError::AlreadyExists(id) => {
                Self::Validation(format!("call session already exists: {id}"))
            }
            SessionError::Completed(_) => Self::InvalidTransition {
                state: CallState::Completed,
                event: "transcript_append",
            },
            other => Self::Internal(other.to_string()),
        }
    }
}
