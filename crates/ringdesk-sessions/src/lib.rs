//! Session Store for the Ringdesk platform.
//!
//! Owns the durable per-call record (`call_sessions`), the append-only
//! conversation transcript (`transcript_turns`), and the append-only call
//! event log (`call_event_log`).
//!
//! The store guarantees the data-model invariants: a session is created
//! exactly once per call identifier, transcript turns are only ever appended
//! (never reordered or mutated), no turn is appended once a session is
//! completed, and events are immutable once written.
//!
//! Concurrent writers race at SQLite's native consistency (last write wins on
//! full-record fields). Serial delivery of one call's events is an upstream
//! telephony-provider contract, not a lock enforced here.

mod error;
mod event;
mod store;

pub use error::SessionError;
pub use event::{CallEvent, CallEventPayload, EventFilter};
pub use store::{
    append_event, append_turn, complete_session, create_session, get_session, get_transcript,
    query_events, update_session, SessionUpdate,
};
