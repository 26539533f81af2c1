//! The call orchestrator.
//!
//! One inbound webhook event per invocation. Each handler loads the session,
//! validates the event against the transition table, drives the components
//! the transition requires, persists the result, and returns the provider
//! instruction. Database work runs on the blocking pool; external calls
//! (STT, dialogue, notification posts) are awaited directly with their own
//! timeouts.

use std::sync::Arc;

use base64::Engine as _;
use serde::Deserialize;

use ringdesk_db::DbPool;
use ringdesk_dialogue::DialogueEngine;
use ringdesk_notify::{plan_notifications, Dispatcher};
use ringdesk_sessions::{CallEventPayload, SessionUpdate};
use ringdesk_speech::SpeechClient;
use ringdesk_types::{CallState, HandledBy, Language, Outcome, TurnRole};

use crate::error::EngineError;
use crate::outcome::{classify_end, detect_booking, promote_to_booking};
use crate::prompts;
use crate::protocol::{
    CallEndRequest, CallEndResponse, CallInputRequest, CallStartRequest, CallStartResponse,
    DtmfMenu, DtmfOption, InputAction, ListenConfig, SpokenMessage, SttSessionConfig,
    TransferInstruction,
};
use crate::state::{transition_allowed, EventKind};

/// Recognition language advertised to the provider when the AI conversation
/// opens.
const STT_LANGUAGE: &str = "ru-RU";

/// Orchestrator knobs that come from deployment configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Number the blind transfer hands Uzbek-language calls to.
    pub operator_number: String,

    /// Timeout advertised with the transfer instruction, in seconds.
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u32,
}

fn default_transfer_timeout_secs() -> u32 {
    30
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            operator_number: "+998000000000".to_string(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
        }
    }
}

/// The webhook-driven call state machine.
pub struct Orchestrator {
    pool: DbPool,
    speech: SpeechClient,
    dialogue: Arc<DialogueEngine>,
    dispatcher: Dispatcher,
    settings: EngineSettings,
}

impl Orchestrator {
    pub fn new(
        pool: DbPool,
        speech: SpeechClient,
        dialogue: Arc<DialogueEngine>,
        dispatcher: Dispatcher,
        settings: EngineSettings,
    ) -> Self {
        Self {
            pool,
            speech,
            dialogue,
            dispatcher,
            settings,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs a database closure on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, EngineError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| EngineError::Internal(format!("db pool: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| EngineError::Internal(format!("db task join: {e}")))?
    }

    /// Creates the session for a new call and returns the language menu.
    pub async fn handle_call_start(
        &self,
        req: CallStartRequest,
    ) -> Result<CallStartResponse, EngineError> {
        let call_id = required_call_id(req.call_id.as_deref())?;
        let caller_number = req.caller_number;

        self.with_conn({
            let call_id = call_id.clone();
            move |conn| {
                ringdesk_sessions::create_session(conn, &call_id, caller_number.as_deref())?;
                ringdesk_sessions::append_event(conn, &call_id, &CallEventPayload::Start { caller_number })?;
                ringdesk_sessions::update_session(
                    conn,
                    &call_id,
                    &SessionUpdate {
                        state: Some(CallState::LanguagePending),
                        ..Default::default()
                    },
                )?;
                Ok(())
            }
        })
        .await?;

        tracing::info!(call_id = %call_id, "call started, menu offered");
        Ok(menu_response())
    }

    /// Dispatches a `call-input` event by its input type.
    pub async fn handle_input(&self, req: CallInputRequest) -> Result<InputAction, EngineError> {
        let call_id = required_call_id(req.call_id.as_deref())?;

        match req.input_type.as_deref() {
            Some("dtmf") => {
                let digit = req
                    .input
                    .ok_or_else(|| EngineError::Validation("input digit is required".into()))?;
                self.handle_dtmf(call_id, digit).await
            }
            Some("speech") => {
                let audio = req
                    .audio_data
                    .ok_or_else(|| EngineError::Validation("audioData is required".into()))?;
                self.handle_speech(call_id, audio).await
            }
            other => Err(EngineError::Validation(format!(
                "unsupported inputType: {}",
                other.unwrap_or("<missing>")
            ))),
        }
    }

    /// Resolves the language menu from a DTMF digit.
    async fn handle_dtmf(&self, call_id: String, digit: String) -> Result<InputAction, EngineError> {
        let operator_number = self.settings.operator_number.clone();
        let transfer_timeout = self.settings.transfer_timeout_secs;

        let action = self
            .with_conn({
                let call_id = call_id.clone();
                move |conn| {
                    let session = ringdesk_sessions::get_session(conn, &call_id)?;
                    if !transition_allowed(session.state, EventKind::Dtmf) {
                        return Err(EngineError::InvalidTransition {
                            state: session.state,
                            event: EventKind::Dtmf.as_str(),
                        });
                    }

                    let accepted = matches!(digit.as_str(), "1" | "2");
                    ringdesk_sessions::append_event(
                        conn,
                        &call_id,
                        &CallEventPayload::DtmfInput {
                            digit: digit.clone(),
                            accepted,
                        },
                    )?;

                    match digit.as_str() {
                        "1" => {
                            ringdesk_sessions::update_session(
                                conn,
                                &call_id,
                                &SessionUpdate {
                                    language: Some(Language::Ru),
                                    handled_by: Some(HandledBy::Ai),
                                    state: Some(CallState::AiConversation),
                                    ..Default::default()
                                },
                            )?;
                            ringdesk_sessions::append_event(
                                conn,
                                &call_id,
                                &CallEventPayload::LanguageSelected {
                                    language: Language::Ru,
                                    handled_by: HandledBy::Ai,
                                },
                            )?;
                            Ok(InputAction::StartConversation {
                                message: prompts::AI_GREETING.to_string(),
                                config: SttSessionConfig {
                                    stt_enabled: true,
                                    stt_language: STT_LANGUAGE.to_string(),
                                    continuous_listening: true,
                                },
                            })
                        }
                        "2" => {
                            ringdesk_sessions::update_session(
                                conn,
                                &call_id,
                                &SessionUpdate {
                                    language: Some(Language::Uz),
                                    handled_by: Some(HandledBy::Human),
                                    outcome: Some(Outcome::Transfer),
                                    state: Some(CallState::HumanTransferred),
                                    ..Default::default()
                                },
                            )?;
                            ringdesk_sessions::append_event(
                                conn,
                                &call_id,
                                &CallEventPayload::LanguageSelected {
                                    language: Language::Uz,
                                    handled_by: HandledBy::Human,
                                },
                            )?;
                            Ok(InputAction::Transfer {
                                message: prompts::TRANSFER_MESSAGE.to_string(),
                                transfer: TransferInstruction {
                                    to: operator_number,
                                    kind: "blind".to_string(),
                                    timeout: transfer_timeout,
                                },
                            })
                        }
                        // Stays in LanguagePending; the menu may repeat
                        // indefinitely, the advertised retry cap is
                        // provider-enforced.
                        _ => Ok(InputAction::Retry {
                            message: prompts::MENU_INVALID_PROMPT.to_string(),
                        }),
                    }
                }
            })
            .await?;

        tracing::info!(call_id = %call_id, "dtmf input processed");
        Ok(action)
    }

    /// One speech turn of the AI conversation.
    ///
    /// STT and dialogue faults degrade to scripted `continue` responses with
    /// an audit event on the session; the call is never terminated from here.
    async fn handle_speech(
        &self,
        call_id: String,
        audio_b64: String,
    ) -> Result<InputAction, EngineError> {
        self.with_conn({
            let call_id = call_id.clone();
            move |conn| {
                let session = ringdesk_sessions::get_session(conn, &call_id)?;
                if !transition_allowed(session.state, EventKind::Speech) {
                    return Err(EngineError::InvalidTransition {
                        state: session.state,
                        event: EventKind::Speech.as_str(),
                    });
                }
                Ok(())
            }
        })
        .await?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(audio_b64.as_bytes())
            .map_err(|e| EngineError::Validation(format!("audioData is not valid base64: {e}")))?;

        let stt = self.speech.transcribe(&audio).await;
        let Some(user_text) = stt.text else {
            let error = stt.error.unwrap_or_else(|| "no text recognized".to_string());
            tracing::warn!(call_id = %call_id, error = %error, "stt failed, re-prompting");
            self.with_conn({
                let call_id = call_id.clone();
                move |conn| {
                    ringdesk_sessions::append_event(conn, &call_id, &CallEventPayload::SttError { error })?;
                    Ok(())
                }
            })
            .await?;
            return Ok(spoken_continue(prompts::STT_RETRY_PROMPT));
        };

        let transcript = self
            .with_conn({
                let call_id = call_id.clone();
                let user_text = user_text.clone();
                move |conn| {
                    ringdesk_sessions::append_turn(conn, &call_id, TurnRole::User, &user_text)?;
                    ringdesk_sessions::append_event(
                        conn,
                        &call_id,
                        &CallEventPayload::UserSpeech { text: user_text },
                    )?;
                    Ok(ringdesk_sessions::get_transcript(conn, &call_id)?)
                }
            })
            .await?;

        let reply = self.dialogue.reply(&transcript).await;
        let Some(reply_text) = reply.text else {
            let error = reply.error.unwrap_or_else(|| "no reply produced".to_string());
            tracing::warn!(call_id = %call_id, error = %error, "dialogue failed, apologizing");
            self.with_conn({
                let call_id = call_id.clone();
                move |conn| {
                    ringdesk_sessions::append_event(conn, &call_id, &CallEventPayload::LlmError { error })?;
                    Ok(())
                }
            })
            .await?;
            return Ok(spoken_continue(prompts::LLM_APOLOGY));
        };

        let filtered = reply.filtered;
        let response = self
            .with_conn({
                let call_id = call_id.clone();
                let reply_text = reply_text.clone();
                move |conn| {
                    ringdesk_sessions::append_turn(conn, &call_id, TurnRole::Assistant, &reply_text)?;
                    ringdesk_sessions::append_event(
                        conn,
                        &call_id,
                        &CallEventPayload::AiResponse {
                            text: reply_text.clone(),
                            filtered,
                        },
                    )?;

                    if detect_booking(&user_text, &reply_text) {
                        let session = ringdesk_sessions::get_session(conn, &call_id)?;
                        let promoted = promote_to_booking(session.outcome);
                        if promoted != session.outcome {
                            ringdesk_sessions::update_session(
                                conn,
                                &call_id,
                                &SessionUpdate {
                                    outcome: Some(promoted),
                                    ..Default::default()
                                },
                            )?;
                            tracing::info!(call_id = %call_id, "booking intent detected");
                        }
                    }

                    Ok(spoken_continue(&reply_text))
                }
            })
            .await?;

        Ok(response)
    }

    /// Completes the call: final outcome, terminal session form, durable
    /// notification enqueue, then one settle-all delivery pass.
    pub async fn handle_call_end(
        &self,
        req: CallEndRequest,
    ) -> Result<CallEndResponse, EngineError> {
        let call_id = required_call_id(req.call_id.as_deref())?;
        let duration = req.duration.unwrap_or(0);
        let end_reason = req.end_reason;

        let outcome = self
            .with_conn({
                let call_id = call_id.clone();
                move |conn| {
                    let session = ringdesk_sessions::get_session(conn, &call_id)?;
                    if !transition_allowed(session.state, EventKind::End) {
                        return Err(EngineError::InvalidTransition {
                            state: session.state,
                            event: EventKind::End.as_str(),
                        });
                    }

                    let outcome = classify_end(session.outcome, duration, end_reason.as_deref());
                    let completed = ringdesk_sessions::complete_session(conn, &call_id, outcome, duration)?;
                    ringdesk_sessions::append_event(
                        conn,
                        &call_id,
                        &CallEventPayload::End {
                            end_reason,
                            duration_seconds: duration,
                            outcome,
                        },
                    )?;

                    for (channel, envelope) in plan_notifications(&completed) {
                        ringdesk_notify::enqueue(conn, &call_id, channel, &envelope)
                            .map_err(|e| EngineError::Internal(e.to_string()))?;
                    }

                    Ok(outcome)
                }
            })
            .await?;

        // One settle-all pass before responding. Rows that fail here stay
        // pending and are picked up by the background retry task.
        let delivered = self
            .dispatcher
            .dispatch_pending_for_call(&self.pool, &call_id)
            .await;

        self.with_conn({
            let call_id = call_id.clone();
            move |conn| {
                ringdesk_sessions::update_session(
                    conn,
                    &call_id,
                    &SessionUpdate {
                        notified: Some(true),
                        notified_at: Some(chrono::Utc::now().to_rfc3339()),
                        ..Default::default()
                    },
                )?;
                Ok(())
            }
        })
        .await?;

        tracing::info!(
            call_id = %call_id,
            outcome = outcome.as_str(),
            duration,
            delivered,
            "call completed"
        );

        Ok(CallEndResponse {
            success: true,
            message: prompts::CALL_END_MESSAGE.to_string(),
            call_id,
            outcome,
            duration,
        })
    }
}

fn required_call_id(raw: Option<&str>) -> Result<String, EngineError> {
    match raw.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(EngineError::Validation("callId is required".into())),
    }
}

fn spoken_continue(text: &str) -> InputAction {
    InputAction::Continue {
        message: SpokenMessage {
            text: text.to_string(),
            language: Language::Ru,
            voice: prompts::DEFAULT_VOICE.to_string(),
        },
        config: ListenConfig {
            continue_listening: true,
        },
    }
}

fn menu_response() -> CallStartResponse {
    CallStartResponse {
        success: true,
        action: "gather".to_string(),
        message: DtmfMenu {
            kind: "dtmf_menu".to_string(),
            prompt: prompts::MENU_PROMPT.to_string(),
            options: vec![
                DtmfOption {
                    digit: "1".to_string(),
                    action: "russian_ai".to_string(),
                    label: "Русский язык".to_string(),
                },
                DtmfOption {
                    digit: "2".to_string(),
                    action: "uzbek_operator".to_string(),
                    label: "O'zbek tili".to_string(),
                },
            ],
            timeout: prompts::MENU_TIMEOUT_SECS,
            num_digits: prompts::MENU_NUM_DIGITS,
            retries: prompts::MENU_RETRIES,
            invalid_prompt: prompts::MENU_INVALID_PROMPT.to_string(),
        },
    }
}
