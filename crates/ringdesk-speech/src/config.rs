use serde::Deserialize;

/// Configuration for the external STT/TTS provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    /// Base URL of the provider (e.g. `https://stt.example.com`).
    pub base_url: String,

    /// Bearer token for the provider, if it requires one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Recognition language tag sent with every STT request.
    #[serde(default = "default_language")]
    pub language: String,

    /// Audio sample rate in Hz. Telephony audio is 8 kHz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Maximum accepted audio payload, in bytes.
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_language() -> String {
    "ru-RU".to_string()
}

fn default_sample_rate() -> u32 {
    8_000
}

fn default_max_audio_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            language: default_language(),
            sample_rate: default_sample_rate(),
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}
