//! Session store against the real migrated schema.

use ringdesk_db::{create_pool, run_migrations, DbRuntimeSettings};
use ringdesk_sessions::{
    append_event, append_turn, complete_session, create_session, get_session, get_transcript,
    query_events, CallEventPayload, EventFilter,
};
use ringdesk_types::{CallStatus, Outcome, TurnRole};

fn migrated_pool() -> ringdesk_db::DbPool {
    let pool = create_pool(":memory:", DbRuntimeSettings {
        busy_timeout_ms: 5_000,
        pool_max_size: 1,
    })
    .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    run_migrations(&conn).expect("failed to run migrations");
    pool
}

#[test]
fn full_call_lifecycle_persists() {
    let pool = migrated_pool();
    let conn = pool.get().unwrap();

    create_session(&conn, "call-1", Some("+998901112233")).unwrap();
    append_event(&conn, "call-1", &CallEventPayload::Start {
        caller_number: Some("+998901112233".to_string()),
    })
    .unwrap();

    append_turn(&conn, "call-1", TurnRole::User, "здравствуйте").unwrap();
    append_turn(&conn, "call-1", TurnRole::Assistant, "чем могу помочь?").unwrap();

    complete_session(&conn, "call-1", Outcome::Info, 37).unwrap();

    let session = get_session(&conn, "call-1").unwrap();
    assert_eq!(session.status, CallStatus::Completed);
    assert_eq!(session.call_duration_seconds, Some(37));

    let transcript = get_transcript(&conn, "call-1").unwrap();
    let roles: Vec<_> = transcript.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![TurnRole::User, TurnRole::Assistant]);

    let events = query_events(&conn, "call-1", &EventFilter::default()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "start");
}

#[test]
fn schema_enforces_transcript_role_check() {
    let pool = migrated_pool();
    let conn = pool.get().unwrap();
    create_session(&conn, "call-2", None).unwrap();

    let err = conn.execute(
        "INSERT INTO transcript_turns (call_id, turn_index, role, content)
         VALUES ('call-2', 0, 'narrator', 'x')",
        [],
    );
    assert!(err.is_err(), "role CHECK constraint should reject unknown roles");
}
