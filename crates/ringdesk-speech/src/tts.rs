//! Text-to-speech over the provider's HTTP synthesis endpoint.

use serde::Serialize;

use crate::error::SpeechError;
use crate::SpeechClient;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion
/// from oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Rendering options for one synthesis request.
#[derive(Debug, Clone, Serialize)]
pub struct TtsOptions {
    pub voice: String,
    pub language: String,
    pub speed: f32,
    pub emotion: String,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            voice: "alena".to_string(),
            language: "ru-RU".to_string(),
            speed: 1.0,
            emotion: "neutral".to_string(),
        }
    }
}

/// Structured outcome of one synthesis request.
#[derive(Debug, Clone)]
pub struct TtsResult {
    pub success: bool,
    /// Raw audio bytes, present only on success.
    pub audio: Option<Vec<u8>>,
    /// Failure description, present only on failure.
    pub error: Option<String>,
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    #[serde(flatten)]
    options: &'a TtsOptions,
    sample_rate: u32,
}

impl SpeechClient {
    /// Renders text to audio.
    ///
    /// Never returns `Err`: all failures fold into `TtsResult`.
    pub async fn synthesize(&self, text: &str, options: &TtsOptions) -> TtsResult {
        match self.try_synthesize(text, options).await {
            Ok(audio) => TtsResult {
                success: true,
                audio: Some(audio),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "tts request failed");
                TtsResult {
                    success: false,
                    audio: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_synthesize(
        &self,
        text: &str,
        options: &TtsOptions,
    ) -> Result<Vec<u8>, SpeechError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(SpeechError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {})",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        if !(0.1..=10.0).contains(&options.speed) {
            return Err(SpeechError::Tts(
                "speed must be between 0.1 and 10.0".to_string(),
            ));
        }

        let config = self.config();
        let url = format!("{}/v1/synthesize", config.base_url.trim_end_matches('/'));
        let body = SynthesisRequest {
            text,
            options,
            sample_rate: config.sample_rate,
        };

        let mut request = self.http().post(url).json(&body);
        if let Some(key) = &config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SpeechError::Tts(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Tts(format!(
                "provider returned {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Tts(format!("failed to read audio body: {e}")))?;

        Ok(audio.to_vec())
    }
}
