use thiserror::Error;

/// Errors internal to the speech adapter.
///
/// These never cross the adapter boundary as raised errors during a call:
/// [`crate::SpeechClient`] folds them into the structured `SttResult` /
/// `TtsResult` payloads.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("invalid speech configuration: {0}")]
    Config(String),

    #[error("stt request failed: {0}")]
    Stt(String),

    #[error("tts request failed: {0}")]
    Tts(String),
}
