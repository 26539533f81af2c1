//! Call Orchestrator for the Ringdesk platform.
//!
//! The webhook-triggered state machine that owns a call's lifecycle from
//! start to completion. One inbound webhook event at a time: the orchestrator
//! loads the session, validates the event against an explicit transition
//! table, drives the speech adapter / dialogue engine / outcome classifier as
//! the current state requires, persists the result, and returns an
//! instruction payload for the telephony provider.
//!
//! External-dependency failures (STT, dialogue provider, notification
//! channels) never abort a call: each one degrades to a scripted in-language
//! response and an audit event on the session.

mod error;
mod orchestrator;
mod outcome;
pub mod prompts;
mod protocol;
mod state;

pub use error::EngineError;
pub use orchestrator::{EngineSettings, Orchestrator};
pub use outcome::{classify_end, detect_booking, promote_to_booking};
pub use protocol::{
    CallEndRequest, CallEndResponse, CallInputRequest, CallStartRequest, CallStartResponse,
    DtmfMenu, DtmfOption, InputAction, ListenConfig, SpokenMessage, SttSessionConfig,
    TransferInstruction,
};
pub use state::{transition_allowed, EventKind};
