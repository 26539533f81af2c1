//! Read-only inspection endpoints for call sessions and their event logs.

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use ringdesk_engine::EngineError;
use ringdesk_sessions::EventFilter;

use crate::{error_response, AppState};

/// `GET /api/calls/{callId}`: the session record plus its transcript.
pub async fn get_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<Value>, Response> {
    let pool = state.pool.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| EngineError::Internal(format!("db pool: {e}")))?;
        let session = ringdesk_sessions::get_session(&conn, &call_id)?;
        let transcript = ringdesk_sessions::get_transcript(&conn, &call_id)?;
        Ok::<_, EngineError>((session, transcript))
    })
    .await
    .map_err(|e| error_response(EngineError::Internal(format!("db task join: {e}"))))?;

    let (session, transcript) = result.map_err(error_response)?;
    Ok(Json(json!({
        "session": session,
        "transcript": transcript,
    })))
}

/// Query parameters for the event log endpoint.
#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// Filter by event type string (e.g. `stt_error`).
    #[serde(rename = "eventType")]
    pub event_type: Option<String>,
    /// Only events at or after this ISO 8601 timestamp.
    pub since: Option<String>,
    /// Maximum number of events (default 100).
    pub limit: Option<i64>,
}

/// `GET /api/calls/{callId}/events`: the call's audit trail, oldest first.
pub async fn get_call_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_id): Path<String>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Value>, Response> {
    let pool = state.pool.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| EngineError::Internal(format!("db pool: {e}")))?;

        // A miss must be a 404, not an empty list.
        ringdesk_sessions::get_session(&conn, &call_id)?;

        let filter = EventFilter {
            event_type: query.event_type,
            since: query.since,
            limit: query.limit,
        };
        Ok::<_, EngineError>(ringdesk_sessions::query_events(&conn, &call_id, &filter)?)
    })
    .await
    .map_err(|e| error_response(EngineError::Internal(format!("db task join: {e}"))))?;

    let events = result.map_err(error_response)?;
    Ok(Json(json!({ "events": events })))
}
