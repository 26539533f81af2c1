use thiserror::Error;

/// Errors that can occur inside the notification dispatcher.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The downstream channel has no URL configured.
    #[error("channel not configured: {0}")]
    ChannelUnconfigured(String),

    /// Transport failure, timeout, or non-2xx from the downstream channel.
    #[error("delivery failed: {0}")]
    Delivery(String),
}
