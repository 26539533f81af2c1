//! Durable outbox persistence.
//!
//! Each row records the intent to deliver one envelope to one channel.
//! Enqueue happens in the same call-end flow that completes the session, so
//! a crash between completion and delivery loses nothing: the retry pass
//! picks the row up later.

use rusqlite::{params, Connection, Row};

use crate::channels::{NotificationEnvelope, NotifyChannel};
use crate::error::NotifyError;

/// Delivery status of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Sent,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

/// A single row from the `notification_outbox` table.
#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub id: i64,
    pub call_id: String,
    pub channel: NotifyChannel,
    pub payload_json: String,
    pub status: OutboxStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
}

fn map_row(row: &Row<'_>) -> Result<OutboxRow, rusqlite::Error> {
    let channel_raw: String = row.get(2)?;
    let status_raw: String = row.get(4)?;
    let parse_failure = |idx: usize, e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    };

    Ok(OutboxRow {
        id: row.get(0)?,
        call_id: row.get(1)?,
        channel: channel_raw.parse().map_err(|e| parse_failure(2, e))?,
        payload_json: row.get(3)?,
        status: status_raw.parse().map_err(|e| parse_failure(4, e))?,
        attempts: row.get(5)?,
        last_error: row.get(6)?,
    })
}

const OUTBOX_COLUMNS: &str = "id, call_id, channel, payload_json, status, attempts, last_error";

/// Durably records the intent to deliver one envelope.
pub fn enqueue(
    conn: &Connection,
    call_id: &str,
    channel: NotifyChannel,
    envelope: &NotificationEnvelope,
) -> Result<OutboxRow, NotifyError> {
    let payload_json = serde_json::to_string(envelope)?;

    let id = conn.query_row(
        "INSERT INTO notification_outbox (call_id, channel, payload_json)
         VALUES (?1, ?2, ?3)
         RETURNING id",
        params![call_id, channel.as_str(), payload_json],
        |row| row.get::<_, i64>(0),
    )?;

    Ok(OutboxRow {
        id,
        call_id: call_id.to_string(),
        channel,
        payload_json,
        status: OutboxStatus::Pending,
        attempts: 0,
        last_error: None,
    })
}

/// Returns all still-pending rows for one call, oldest first.
pub fn pending_for_call(conn: &Connection, call_id: &str) -> Result<Vec<OutboxRow>, NotifyError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OUTBOX_COLUMNS} FROM notification_outbox
         WHERE call_id = ?1 AND status = 'pending'
         ORDER BY id ASC"
    ))?;
    let rows = collect_rows(stmt.query_map([call_id], map_row)?);
    rows
}

/// Returns rows due for a retry pass: pending rows with remaining attempt
/// budget, oldest first, bounded by `limit`.
pub fn pending_for_retry(
    conn: &Connection,
    max_attempts: i64,
    limit: i64,
) -> Result<Vec<OutboxRow>, NotifyError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OUTBOX_COLUMNS} FROM notification_outbox
         WHERE status = 'pending' AND attempts < ?1
         ORDER BY id ASC
         LIMIT ?2"
    ))?;
    let rows = collect_rows(stmt.query_map(params![max_attempts, limit], map_row)?);
    rows
}

fn collect_rows(
    rows: rusqlite::MappedRows<'_, impl FnMut(&Row<'_>) -> Result<OutboxRow, rusqlite::Error>>,
) -> Result<Vec<OutboxRow>, NotifyError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Records the result of one delivery attempt.
///
/// Success marks the row `sent`. Failure increments the attempt counter and
/// keeps the row `pending` until the attempt budget is exhausted, at which
/// point the row is marked `failed` permanently.
pub fn mark_attempt(
    conn: &Connection,
    row_id: i64,
    result: Result<(), &str>,
    max_attempts: i64,
) -> Result<(), NotifyError> {
    match result {
        Ok(()) => {
            conn.execute(
                "UPDATE notification_outbox
                 SET status = 'sent', attempts = attempts + 1,
                     last_error = NULL, sent_at = datetime('now')
                 WHERE id = ?1",
                [row_id],
            )?;
        }
        Err(error) => {
            conn.execute(
                "UPDATE notification_outbox
                 SET attempts = attempts + 1,
                     last_error = ?2,
                     status = CASE WHEN attempts + 1 >= ?3 THEN 'failed' ELSE 'pending' END
                 WHERE id = ?1",
                params![row_id, error, max_attempts],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> NotificationEnvelope {
        NotificationEnvelope {
            event: "call_completed".to_string(),
            call_id: "abc123".to_string(),
            caller_number: None,
            language: "RU".to_string(),
            handled_by: "AI".to_string(),
            outcome: "info".to_string(),
            duration_seconds: Some(30),
        }
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notification_outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                call_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                sent_at TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn enqueue_then_load_pending() {
        let conn = test_conn();
        enqueue(&conn, "abc123", NotifyChannel::SheetLog, &envelope()).unwrap();
        enqueue(&conn, "abc123", NotifyChannel::Alert, &envelope()).unwrap();

        let pending = pending_for_call(&conn, "abc123").unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].channel, NotifyChannel::SheetLog);
        assert_eq!(pending[1].channel, NotifyChannel::Alert);
    }

    #[test]
    fn success_marks_sent() {
        let conn = test_conn();
        let row = enqueue(&conn, "abc123", NotifyChannel::SheetLog, &envelope()).unwrap();

        mark_attempt(&conn, row.id, Ok(()), 5).unwrap();

        assert!(pending_for_call(&conn, "abc123").unwrap().is_empty());
        let status: String = conn
            .query_row(
                "SELECT status FROM notification_outbox WHERE id = ?1",
                [row.id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(status, "sent");
    }

    #[test]
    fn failures_respect_attempt_budget() {
        let conn = test_conn();
        let row = enqueue(&conn, "abc123", NotifyChannel::Alert, &envelope()).unwrap();

        mark_attempt(&conn, row.id, Err("timeout"), 3).unwrap();
        mark_attempt(&conn, row.id, Err("timeout"), 3).unwrap();
        let due = pending_for_retry(&conn, 3, 10).unwrap();
        assert_eq!(due.len(), 1, "two attempts used, one left");
        assert_eq!(due[0].attempts, 2);
        assert_eq!(due[0].last_error.as_deref(), Some("timeout"));

        mark_attempt(&conn, row.id, Err("timeout"), 3).unwrap();
        assert!(
            pending_for_retry(&conn, 3, 10).unwrap().is_empty(),
            "budget exhausted"
        );
        let status: String = conn
            .query_row(
                "SELECT status FROM notification_outbox WHERE id = ?1",
                [row.id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(status, "failed");
    }
}
