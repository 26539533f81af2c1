use thiserror::Error;

/// Errors that can occur during session-store operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The referenced call identifier has no session. A defined miss, not a
    /// fault: callers surface it as a 404-equivalent.
    #[error("call session not found: {0}")]
    NotFound(String),

    /// A session already exists for this call identifier. Creation only
    /// occurs on the start event.
    #[error("call session already exists: {0}")]
    AlreadyExists(String),

    /// The session is completed; its transcript no longer accepts appends.
    #[error("call session is completed: {0}")]
    Completed(String),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
