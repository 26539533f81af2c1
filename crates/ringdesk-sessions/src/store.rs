//! Persistence operations for call sessions, transcripts, and the event log.
//!
//! All session mutations go through [`update_session`] (a partial merge built
//! as a single dynamic UPDATE) or [`complete_session`]. Transcript and event
//! appends assign their per-call ordering atomically inside the INSERT, so
//! two writers can never observe the same position.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::error::SessionError;
use crate::event::{CallEvent, CallEventPayload, EventFilter};
use ringdesk_types::{
    CallSession, CallState, CallStatus, HandledBy, Language, Outcome, TranscriptTurn, TurnRole,
};

const SESSION_COLUMNS: &str = "id, call_id, caller_number, language, handled_by, outcome, status,
     state, call_duration_seconds, notified, notified_at, created_at, updated_at";

fn parse_column<T>(row: &Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_row_to_session(row: &Row<'_>) -> Result<CallSession, rusqlite::Error> {
    Ok(CallSession {
        id: row.get(0)?,
        call_id: row.get(1)?,
        caller_number: row.get(2)?,
        language: parse_column::<Language>(row, 3)?,
        handled_by: parse_column::<HandledBy>(row, 4)?,
        outcome: parse_column::<Outcome>(row, 5)?,
        status: parse_column::<CallStatus>(row, 6)?,
        state: parse_column::<CallState>(row, 7)?,
        call_duration_seconds: row.get(8)?,
        notified: row.get(9)?,
        notified_at: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Creates the session for a new call with the default field values
/// (`RU`, `AI`, `info`, `active`, state `started`).
///
/// # Errors
///
/// Returns `SessionError::AlreadyExists` if a session for this call
/// identifier was created before; creation only occurs on the start event.
pub fn create_session(
    conn: &Connection,
    call_id: &str,
    caller_number: Option<&str>,
) -> Result<CallSession, SessionError> {
    let inserted = conn.execute(
        "INSERT INTO call_sessions (call_id, caller_number) VALUES (?1, ?2)",
        params![call_id, caller_number],
    );

    match inserted {
        Ok(_) => {
            tracing::debug!(call_id, "created call session");
            get_session(conn, call_id)
        }
        Err(e) if is_unique_violation(&e) => Err(SessionError::AlreadyExists(call_id.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    )
}

/// Retrieves a session by call identifier.
///
/// # Errors
///
/// Returns `SessionError::NotFound` for an unknown call identifier.
pub fn get_session(conn: &Connection, call_id: &str) -> Result<CallSession, SessionError> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM call_sessions WHERE call_id = ?1"),
        [call_id],
        map_row_to_session,
    )
    .optional()?
    .ok_or_else(|| SessionError::NotFound(call_id.to_string()))
}

/// Partial update of a call session. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub language: Option<Language>,
    pub handled_by: Option<HandledBy>,
    pub outcome: Option<Outcome>,
    pub status: Option<CallStatus>,
    pub state: Option<CallState>,
    pub call_duration_seconds: Option<i64>,
    pub notified: Option<bool>,
    pub notified_at: Option<String>,
}

/// Applies a partial merge to an existing session using a single atomic
/// UPDATE statement.
///
/// Only fields that are `Some` in `updates` are modified. Building one UPDATE
/// avoids the read-modify-write race of fetching the row, mutating in memory,
/// and writing it back.
///
/// # Errors
///
/// Returns `SessionError::NotFound` for an unknown call identifier.
pub fn update_session(
    conn: &Connection,
    call_id: &str,
    updates: &SessionUpdate,
) -> Result<CallSession, SessionError> {
    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    let mut push = |column: &str, value: Box<dyn rusqlite::types::ToSql>| {
        set_parts.push(format!("{column} = ?{idx}"));
        values.push(value);
        idx += 1;
    };

    if let Some(language) = updates.language {
        push("language", Box::new(language.as_str()));
    }
    if let Some(handled_by) = updates.handled_by {
        push("handled_by", Box::new(handled_by.as_str()));
    }
    if let Some(outcome) = updates.outcome {
        push("outcome", Box::new(outcome.as_str()));
    }
    if let Some(status) = updates.status {
        push("status", Box::new(status.as_str()));
    }
    if let Some(state) = updates.state {
        push("state", Box::new(state.as_str()));
    }
    if let Some(duration) = updates.call_duration_seconds {
        push("call_duration_seconds", Box::new(duration));
    }
    if let Some(notified) = updates.notified {
        push("notified", Box::new(notified));
    }
    if let Some(notified_at) = &updates.notified_at {
        push("notified_at", Box::new(notified_at.clone()));
    }

    if set_parts.is_empty() {
        return get_session(conn, call_id);
    }

    set_parts.push("updated_at = datetime('now')".to_string());

    let sql = format!(
        "UPDATE call_sessions SET {} WHERE call_id = ?{idx}",
        set_parts.join(", ")
    );
    values.push(Box::new(call_id.to_string()));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| &**v).collect();
    let changed = conn.execute(&sql, params_refs.as_slice())?;
    if changed == 0 {
        return Err(SessionError::NotFound(call_id.to_string()));
    }

    tracing::debug!(call_id, fields = set_parts.len() - 1, "updated call session");
    get_session(conn, call_id)
}

/// Appends one turn to a call's transcript.
///
/// The turn index is assigned atomically inside the INSERT
/// (`COALESCE(MAX(turn_index), -1) + 1`), so concurrent appends cannot
/// collide on a position.
///
/// # Errors
///
/// Returns `SessionError::NotFound` for an unknown call identifier and
/// `SessionError::Completed` once the session has `status = completed`; a
/// completed transcript never grows.
pub fn append_turn(
    conn: &Connection,
    call_id: &str,
    role: TurnRole,
    content: &str,
) -> Result<TranscriptTurn, SessionError> {
    let session = get_session(conn, call_id)?;
    if session.status == CallStatus::Completed {
        return Err(SessionError::Completed(call_id.to_string()));
    }

    let row = conn.query_row(
        "INSERT INTO transcript_turns (call_id, turn_index, role, content)
         VALUES (
            ?1,
            (SELECT COALESCE(MAX(turn_index), -1) + 1 FROM transcript_turns WHERE call_id = ?1),
            ?2,
            ?3
         )
         RETURNING id, turn_index, created_at",
        params![call_id, role.as_str(), content],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?;

    let (id, turn_index, created_at) = row;
    Ok(TranscriptTurn {
        id,
        call_id: call_id.to_string(),
        turn_index,
        role,
        content: content.to_string(),
        created_at,
    })
}

/// Returns a call's full transcript in chronological order.
pub fn get_transcript(conn: &Connection, call_id: &str) -> Result<Vec<TranscriptTurn>, SessionError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_id, turn_index, role, content, created_at
         FROM transcript_turns WHERE call_id = ?1 ORDER BY turn_index ASC",
    )?;

    let rows = stmt.query_map([call_id], |row| {
        Ok(TranscriptTurn {
            id: row.get(0)?,
            call_id: row.get(1)?,
            turn_index: row.get(2)?,
            role: parse_column::<TurnRole>(row, 3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    let mut turns = Vec::new();
    for row in rows {
        turns.push(row?);
    }
    Ok(turns)
}

/// Appends one event to the call's audit log.
///
/// The sequence number is assigned atomically inside the INSERT, so two
/// concurrent writers can never produce duplicate sequence numbers for the
/// same call. Events are immutable once written.
pub fn append_event(
    conn: &Connection,
    call_id: &str,
    payload: &CallEventPayload,
) -> Result<CallEvent, SessionError> {
    let payload_json = serde_json::to_string(payload)?;

    let row = conn.query_row(
        "INSERT INTO call_event_log (call_id, seq, event_type, payload_json)
         VALUES (
            ?1,
            (SELECT COALESCE(MAX(seq), 0) + 1 FROM call_event_log WHERE call_id = ?1),
            ?2,
            ?3
         )
         RETURNING id, seq, occurred_at",
        params![call_id, payload.event_type(), payload_json],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?;

    let (id, seq, occurred_at) = row;
    tracing::debug!(call_id, event_type = payload.event_type(), seq, "appended call event");
    Ok(CallEvent {
        id,
        call_id: call_id.to_string(),
        seq,
        event_type: payload.event_type().to_string(),
        payload_json,
        occurred_at,
    })
}

/// Queries a call's event log with optional filters, oldest first.
pub fn query_events(
    conn: &Connection,
    call_id: &str,
    filter: &EventFilter,
) -> Result<Vec<CallEvent>, SessionError> {
    // WHERE clauses and bind parameters are collected separately so nothing
    // is interpolated.
    let mut clauses = vec!["call_id = ?1".to_string()];
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(call_id.to_string())];
    let mut idx = 2u32;

    if let Some(ref et) = filter.event_type {
        clauses.push(format!("event_type = ?{idx}"));
        param_values.push(Box::new(et.clone()));
        idx += 1;
    }

    if let Some(ref since) = filter.since {
        clauses.push(format!("occurred_at >= ?{idx}"));
        param_values.push(Box::new(since.clone()));
        idx += 1;
    }

    let limit = filter.limit.unwrap_or(100);
    let where_clause = clauses.join(" AND ");
    let sql = format!(
        "SELECT id, call_id, seq, event_type, payload_json, occurred_at
         FROM call_event_log
         WHERE {where_clause}
         ORDER BY seq ASC
         LIMIT ?{idx}"
    );
    param_values.push(Box::new(limit));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values.iter().map(|p| &**p).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(CallEvent {
            id: row.get(0)?,
            call_id: row.get(1)?,
            seq: row.get(2)?,
            event_type: row.get(3)?,
            payload_json: row.get(4)?,
            occurred_at: row.get(5)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Moves a session to its terminal form: `status = completed`, state
/// `completed`, final outcome and duration recorded.
///
/// # Errors
///
/// Returns `SessionError::NotFound` for an unknown call identifier.
pub fn complete_session(
    conn: &Connection,
    call_id: &str,
    outcome: Outcome,
    duration_seconds: i64,
) -> Result<CallSession, SessionError> {
    update_session(
        conn,
        call_id,
        &SessionUpdate {
            outcome: Some(outcome),
            status: Some(CallStatus::Completed),
            state: Some(CallState::Completed),
            call_duration_seconds: Some(duration_seconds),
            ..Default::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        conn.execute_batch(
            "CREATE TABLE call_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                call_id TEXT NOT NULL UNIQUE,
                caller_number TEXT,
                language TEXT NOT NULL DEFAULT 'RU',
                handled_by TEXT NOT NULL DEFAULT 'AI',
                outcome TEXT NOT NULL DEFAULT 'info',
                status TEXT NOT NULL DEFAULT 'active',
                state TEXT NOT NULL DEFAULT 'started',
                call_duration_seconds INTEGER,
                notified INTEGER NOT NULL DEFAULT 0,
                notified_at TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE TABLE transcript_turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                call_id TEXT NOT NULL,
                turn_index INTEGER NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (call_id, turn_index)
            );
            CREATE TABLE call_event_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                call_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                occurred_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (call_id, seq)
            );",
        )
        .expect("should create tables");
        conn
    }

    #[test]
    fn create_uses_defaults() {
        let conn = test_conn();
        let session = create_session(&conn, "abc123", Some("+998901234567")).unwrap();

        assert_eq!(session.call_id, "abc123");
        assert_eq!(session.language, Language::Ru);
        assert_eq!(session.handled_by, HandledBy::Ai);
        assert_eq!(session.outcome, Outcome::Info);
        assert_eq!(session.status, CallStatus::Active);
        assert_eq!(session.state, CallState::Started);
        assert!(!session.notified);
    }

    #[test]
    fn second_create_for_same_call_rejected() {
        let conn = test_conn();
        create_session(&conn, "abc123", None).unwrap();

        match create_session(&conn, "abc123", None) {
            Err(SessionError::AlreadyExists(id)) => assert_eq!(id, "abc123"),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn get_unknown_is_not_found() {
        let conn = test_conn();
        match get_session(&conn, "ghost") {
            Err(SessionError::NotFound(id)) => assert_eq!(id, "ghost"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn partial_update_merges() {
        let conn = test_conn();
        create_session(&conn, "abc123", Some("+111")).unwrap();

        let session = update_session(
            &conn,
            "abc123",
            &SessionUpdate {
                language: Some(Language::Uz),
                handled_by: Some(HandledBy::Human),
                outcome: Some(Outcome::Transfer),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(session.language, Language::Uz);
        assert_eq!(session.outcome, Outcome::Transfer);
        // Untouched fields survive the merge.
        assert_eq!(session.caller_number.as_deref(), Some("+111"));
        assert_eq!(session.status, CallStatus::Active);
    }

    #[test]
    fn turns_are_ordered_and_indexed() {
        let conn = test_conn();
        create_session(&conn, "abc123", None).unwrap();

        append_turn(&conn, "abc123", TurnRole::User, "привет").unwrap();
        append_turn(&conn, "abc123", TurnRole::Assistant, "здравствуйте").unwrap();
        append_turn(&conn, "abc123", TurnRole::User, "хочу записаться").unwrap();

        let transcript = get_transcript(&conn, "abc123").unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(
            transcript.iter().map(|t| t.turn_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(transcript[1].role, TurnRole::Assistant);
    }

    #[test]
    fn completed_session_refuses_turns() {
        let conn = test_conn();
        create_session(&conn, "abc123", None).unwrap();
        complete_session(&conn, "abc123", Outcome::Info, 42).unwrap();

        match append_turn(&conn, "abc123", TurnRole::User, "ещё") {
            Err(SessionError::Completed(id)) => assert_eq!(id, "abc123"),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn event_seq_is_monotonic_per_call() {
        let conn = test_conn();

        let first = append_event(
            &conn,
            "abc123",
            &CallEventPayload::Start {
                caller_number: None,
            },
        )
        .unwrap();
        let second = append_event(
            &conn,
            "abc123",
            &CallEventPayload::DtmfInput {
                digit: "1".to_string(),
                accepted: true,
            },
        )
        .unwrap();
        let other_call = append_event(
            &conn,
            "xyz789",
            &CallEventPayload::Start {
                caller_number: None,
            },
        )
        .unwrap();

        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(other_call.seq, 1, "seq is per call, not global");
    }

    #[test]
    fn event_query_filters_by_type() {
        let conn = test_conn();
        append_event(
            &conn,
            "abc123",
            &CallEventPayload::Start {
                caller_number: None,
            },
        )
        .unwrap();
        append_event(
            &conn,
            "abc123",
            &CallEventPayload::SttError {
                error: "timeout".to_string(),
            },
        )
        .unwrap();

        let filter = EventFilter {
            event_type: Some("stt_error".to_string()),
            ..Default::default()
        };
        let events = query_events(&conn, "abc123", &filter).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "stt_error");
        assert!(events[0].payload_json.contains("timeout"));
    }
}
