//! Speech-to-text over the provider's HTTP transcription endpoint.

use serde::Deserialize;

use crate::error::SpeechError;
use crate::SpeechClient;

/// Structured outcome of one transcription request.
///
/// `success: false` covers every failure mode (transport errors, timeouts,
/// non-2xx responses, and an empty transcription) so the orchestrator has a
/// single branch to apply its "didn't catch that" fallback.
#[derive(Debug, Clone)]
pub struct SttResult {
    pub success: bool,
    /// Recognized text, present only on success.
    pub text: Option<String>,
    /// Failure description, present only on failure.
    pub error: Option<String>,
}

impl SttResult {
    fn ok(text: String) -> Self {
        Self {
            success: true,
            text: Some(text),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl SpeechClient {
    /// Transcribes phone-quality audio to text.
    ///
    /// Never returns `Err`: all failures fold into `SttResult`.
    pub async fn transcribe(&self, audio: &[u8]) -> SttResult {
        match self.try_transcribe(audio).await {
            Ok(text) if text.trim().is_empty() => {
                SttResult::failed("transcription returned no text".to_string())
            }
            Ok(text) => SttResult::ok(text.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "stt request failed");
                SttResult::failed(e.to_string())
            }
        }
    }

    async fn try_transcribe(&self, audio: &[u8]) -> Result<String, SpeechError> {
        let config = self.config();

        if audio.len() > config.max_audio_bytes {
            return Err(SpeechError::Stt(format!(
                "audio payload exceeds maximum size: {} bytes (limit: {})",
                audio.len(),
                config.max_audio_bytes
            )));
        }

        let url = format!("{}/v1/transcribe", config.base_url.trim_end_matches('/'));
        let mut request = self
            .http()
            .post(url)
            .header("Content-Type", "application/octet-stream")
            .query(&[
                ("language", config.language.as_str()),
                ("sample_rate", &config.sample_rate.to_string()),
                ("encoding", "pcm_s16le"),
            ])
            .body(audio.to_vec());

        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SpeechError::Stt(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Stt(format!(
                "provider returned {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Stt(format!("malformed response: {e}")))?;

        Ok(parsed.text)
    }
}
