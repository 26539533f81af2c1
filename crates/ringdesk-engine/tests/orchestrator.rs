//! End-to-end orchestrator flows against a migrated in-memory database.
//!
//! External providers point at unreachable endpoints, exercising the
//! scripted-fallback paths; the happy speech path with live providers is
//! covered by the server's webhook tests.

use std::sync::Arc;

use base64::Engine as _;

use ringdesk_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use ringdesk_dialogue::{DialogueConfig, DialogueEngine};
use ringdesk_engine::{
    CallEndRequest, CallInputRequest, CallStartRequest, EngineError, EngineSettings, InputAction,
    Orchestrator,
};
use ringdesk_notify::{Dispatcher, NotifyConfig};
use ringdesk_sessions::{EventFilter, SessionUpdate};
use ringdesk_speech::{SpeechClient, SpeechConfig};
use ringdesk_types::{CallState, CallStatus, HandledBy, Language, Outcome};

fn migrated_pool() -> DbPool {
    let pool = create_pool(
        ":memory:",
        DbRuntimeSettings {
            busy_timeout_ms: 5_000,
            pool_max_size: 1,
        },
    )
    .unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();
    pool
}

fn orchestrator(pool: DbPool) -> Orchestrator {
    // Port 9 is not listening, so every provider call fails fast.
    let speech = SpeechClient::new(SpeechConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
        ..Default::default()
    })
    .unwrap();

    let dialogue = DialogueEngine::from_config(&DialogueConfig {
        openai_api_key: Some("sk-test".to_string()),
        base_url: Some("http://127.0.0.1:9".to_string()),
        timeout_secs: 1,
        ..Default::default()
    })
    .unwrap();

    let dispatcher = Dispatcher::new(NotifyConfig::default()).unwrap();

    Orchestrator::new(
        pool,
        speech,
        Arc::new(dialogue),
        dispatcher,
        EngineSettings {
            operator_number: "+998901112233".to_string(),
            ..Default::default()
        },
    )
}

fn start_request(call_id: &str) -> CallStartRequest {
    serde_json::from_value(serde_json::json!({
        "callId": call_id,
        "callerNumber": "+998900000001"
    }))
    .unwrap()
}

fn dtmf_request(call_id: &str, digit: &str) -> CallInputRequest {
    serde_json::from_value(serde_json::json!({
        "callId": call_id,
        "inputType": "dtmf",
        "input": digit
    }))
    .unwrap()
}

fn speech_request(call_id: &str, audio: &[u8]) -> CallInputRequest {
    serde_json::from_value(serde_json::json!({
        "callId": call_id,
        "inputType": "speech",
        "audioData": base64::engine::general_purpose::STANDARD.encode(audio)
    }))
    .unwrap()
}

fn end_request(call_id: &str, duration: i64, end_reason: &str) -> CallEndRequest {
    serde_json::from_value(serde_json::json!({
        "callId": call_id,
        "duration": duration,
        "endReason": end_reason
    }))
    .unwrap()
}

#[tokio::test]
async fn call_start_offers_menu_and_waits_for_digit() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());

    let response = orch.handle_call_start(start_request("abc123")).await.unwrap();
    assert!(response.success);
    assert_eq!(response.action, "gather");
    assert_eq!(response.message.options.len(), 2);

    let conn = pool.get().unwrap();
    let session = ringdesk_sessions::get_session(&conn, "abc123").unwrap();
    assert_eq!(session.state, CallState::LanguagePending);
    assert_eq!(session.language, Language::Ru);
    assert_eq!(session.outcome, Outcome::Info);
    assert_eq!(session.caller_number.as_deref(), Some("+998900000001"));
}

#[tokio::test]
async fn call_start_without_call_id_is_rejected() {
    let orch = orchestrator(migrated_pool());
    let request: CallStartRequest = serde_json::from_value(serde_json::json!({})).unwrap();

    match orch.handle_call_start(request).await {
        Err(EngineError::Validation(msg)) => assert!(msg.contains("callId")),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn repeated_call_start_is_rejected() {
    let orch = orchestrator(migrated_pool());
    orch.handle_call_start(start_request("abc123")).await.unwrap();

    assert!(matches!(
        orch.handle_call_start(start_request("abc123")).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn digit_one_opens_the_ai_conversation() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());
    orch.handle_call_start(start_request("abc123")).await.unwrap();

    let action = orch.handle_input(dtmf_request("abc123", "1")).await.unwrap();
    match action {
        InputAction::StartConversation { config, .. } => {
            assert!(config.stt_enabled);
            assert_eq!(config.stt_language, "ru-RU");
            assert!(config.continuous_listening);
        }
        other => panic!("expected start_conversation, got {other:?}"),
    }

    let conn = pool.get().unwrap();
    let session = ringdesk_sessions::get_session(&conn, "abc123").unwrap();
    assert_eq!(session.language, Language::Ru);
    assert_eq!(session.handled_by, HandledBy::Ai);
    assert_eq!(session.state, CallState::AiConversation);
}

#[tokio::test]
async fn digit_two_is_a_blind_transfer() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());
    orch.handle_call_start(start_request("abc123")).await.unwrap();

    let action = orch.handle_input(dtmf_request("abc123", "2")).await.unwrap();
    match action {
        InputAction::Transfer { transfer, .. } => {
            assert_eq!(transfer.kind, "blind");
            assert_eq!(transfer.to, "+998901112233");
            assert_eq!(transfer.timeout, 30);
        }
        other => panic!("expected transfer, got {other:?}"),
    }

    let conn = pool.get().unwrap();
    let session = ringdesk_sessions::get_session(&conn, "abc123").unwrap();
    assert_eq!(session.language, Language::Uz);
    assert_eq!(session.handled_by, HandledBy::Human);
    assert_eq!(session.outcome, Outcome::Transfer);
    assert_eq!(session.state, CallState::HumanTransferred);
}

#[tokio::test]
async fn unknown_digit_retries_without_mutating_the_session() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());
    orch.handle_call_start(start_request("abc123")).await.unwrap();

    let before = {
        let conn = pool.get().unwrap();
        ringdesk_sessions::get_session(&conn, "abc123").unwrap()
    };

    for digit in ["9", "0", "*", "9"] {
        let action = orch.handle_input(dtmf_request("abc123", digit)).await.unwrap();
        assert!(matches!(action, InputAction::Retry { .. }), "digit {digit}");
    }

    let conn = pool.get().unwrap();
    let after = ringdesk_sessions::get_session(&conn, "abc123").unwrap();
    assert_eq!(after.state, before.state);
    assert_eq!(after.language, before.language);
    assert_eq!(after.handled_by, before.handled_by);
    assert_eq!(after.outcome, before.outcome);

    // Only the event log grew: one rejected dtmf_input per attempt.
    let events = ringdesk_sessions::query_events(
        &conn,
        "abc123",
        &EventFilter {
            event_type: Some("dtmf_input".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.payload_json.contains("\"accepted\":false")));
}

#[tokio::test]
async fn speech_before_language_selection_is_an_invalid_transition() {
    let orch = orchestrator(migrated_pool());
    orch.handle_call_start(start_request("abc123")).await.unwrap();

    match orch.handle_input(speech_request("abc123", &[0u8; 32])).await {
        Err(EngineError::InvalidTransition { state, .. }) => {
            assert_eq!(state, CallState::LanguagePending);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn input_for_unknown_call_is_not_found() {
    let orch = orchestrator(migrated_pool());

    assert!(matches!(
        orch.handle_input(dtmf_request("ghost", "1")).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn malformed_audio_is_a_validation_error() {
    let orch = orchestrator(migrated_pool());
    orch.handle_call_start(start_request("abc123")).await.unwrap();
    orch.handle_input(dtmf_request("abc123", "1")).await.unwrap();

    let request: CallInputRequest = serde_json::from_value(serde_json::json!({
        "callId": "abc123",
        "inputType": "speech",
        "audioData": "not base64!!"
    }))
    .unwrap();

    assert!(matches!(
        orch.handle_input(request).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn stt_failure_reprompts_without_touching_the_transcript() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());
    orch.handle_call_start(start_request("abc123")).await.unwrap();
    orch.handle_input(dtmf_request("abc123", "1")).await.unwrap();

    let action = orch
        .handle_input(speech_request("abc123", &[0u8; 64]))
        .await
        .unwrap();
    match action {
        InputAction::Continue { message, config } => {
            assert!(message.text.contains("не расслышал"));
            assert!(config.continue_listening);
        }
        other => panic!("expected continue, got {other:?}"),
    }

    let conn = pool.get().unwrap();
    assert!(ringdesk_sessions::get_transcript(&conn, "abc123")
        .unwrap()
        .is_empty());
    let errors = ringdesk_sessions::query_events(
        &conn,
        "abc123",
        &EventFilter {
            event_type: Some("stt_error".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(errors.len(), 1);

    // The session is still live.
    let session = ringdesk_sessions::get_session(&conn, "abc123").unwrap();
    assert_eq!(session.status, CallStatus::Active);
    assert_eq!(session.state, CallState::AiConversation);
}

#[tokio::test]
async fn call_end_completes_enqueues_and_marks_notified() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());
    orch.handle_call_start(start_request("abc123")).await.unwrap();
    orch.handle_input(dtmf_request("abc123", "1")).await.unwrap();

    let response = orch
        .handle_call_end(end_request("abc123", 95, "hangup"))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.outcome, Outcome::Info);
    assert_eq!(response.duration, 95);

    let conn = pool.get().unwrap();
    let session = ringdesk_sessions::get_session(&conn, "abc123").unwrap();
    assert_eq!(session.status, CallStatus::Completed);
    assert_eq!(session.state, CallState::Completed);
    assert_eq!(session.call_duration_seconds, Some(95));
    assert!(session.notified);
    assert!(session.notified_at.is_some());

    // Info outcome produces the sheet row only.
    let channels: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT channel FROM notification_outbox WHERE call_id = 'abc123' ORDER BY id")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    };
    assert_eq!(channels, vec!["sheet_log".to_string()]);
}

#[tokio::test]
async fn abnormal_end_overrides_a_booking_with_missed() {
    let pool = migrated_pool();
    let orch = orchestrator(pool.clone());
    orch.handle_call_start(start_request("abc123")).await.unwrap();
    orch.handle_input(dtmf_request("abc123", "1")).await.unwrap();
    {
        let conn = pool.get().unwrap();
        ringdesk_sessions::update_session(
            &conn,
            "abc123",
            &SessionUpdate {
                outcome: Some(Outcome::Booking),
                ..Default::default()
            },
        )
        .unwrap();
    }

    let response = orch
        .handle_call_end(end_request("abc123", 3, "no_answer"))
        .await
        .unwrap();
    assert_eq!(response.outcome, Outcome::Missed);

    // The missed call also raises an alert.
    let conn = pool.get().unwrap();
    let channels: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT channel FROM notification_outbox WHERE call_id = 'abc123' ORDER BY id")
            .unwrap();
        stmt.query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    };
    assert_eq!(channels, vec!["sheet_log".to_string(), "alert".to_string()]);
    let alert_payload: String = conn
        .query_row(
            "SELECT payload_json FROM notification_outbox WHERE channel = 'alert'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(alert_payload.contains("missed_call"));
}

#[tokio::test]
async fn second_call_end_is_an_invalid_transition() {
    let orch = orchestrator(migrated_pool());
    orch.handle_call_start(start_request("abc123")).await.unwrap();
    orch.handle_call_end(end_request("abc123", 40, "hangup"))
        .await
        .unwrap();

    assert!(matches!(
        orch.handle_call_end(end_request("abc123", 40, "hangup")).await,
        Err(EngineError::InvalidTransition { .. })
    ));
}
