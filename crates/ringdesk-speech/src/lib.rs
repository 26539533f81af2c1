//! Speech Adapter for the Ringdesk platform.
//!
//! Wraps an external speech-to-text / text-to-speech HTTP provider behind a
//! uniform request/response contract. Both operations are bounded by an
//! explicit timeout and come back as structured results; an upstream outage
//! must surface as `success: false`, never as a panic or an unhandled fault,
//! so the orchestrator can apply its scripted-fallback policy uniformly.
//!
//! Recognition is fixed to the call's spoken language (`ru-RU`) and
//! phone-quality audio (s16le, 8 kHz by default).

mod config;
mod error;
mod stt;
mod tts;

pub use config::SpeechConfig;
pub use error::SpeechError;
pub use stt::SttResult;
pub use tts::{TtsOptions, TtsResult};

use std::time::Duration;

/// HTTP client for the external STT/TTS provider.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    config: SpeechConfig,
    http: reqwest::Client,
}

impl SpeechClient {
    /// Builds a client with the provider timeout applied to every request.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Config` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self { config, http })
    }

    pub(crate) fn config(&self) -> &SpeechConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}
