//! Server configuration loading from file and environment variables.

use ringdesk_dialogue::DialogueConfig;
use ringdesk_engine::EngineSettings;
use ringdesk_notify::NotifyConfig;
use ringdesk_speech::SpeechConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Call-flow settings (operator number, transfer timeout).
    #[serde(default)]
    pub telephony: EngineSettings,

    /// External STT/TTS provider settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Language-model provider credentials and tunables.
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Downstream notification channel settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Per-call rate limit for speech turns.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "ringdesk_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Fixed-window rate limit applied per call to speech turns.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum speech turns per call within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "ringdesk.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    20
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `RINGDESK_HOST` overrides `server.host`
/// - `RINGDESK_PORT` overrides `server.port`
/// - `RINGDESK_DB_PATH` overrides `database.path`
/// - `RINGDESK_LOG_LEVEL` overrides `logging.level`
/// - `RINGDESK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `RINGDESK_OPERATOR_NUMBER` overrides `telephony.operator_number`
/// - `RINGDESK_SPEECH_URL` / `RINGDESK_SPEECH_API_KEY` override the speech
///   provider endpoint and credential
/// - `RINGDESK_OPENAI_API_KEY` / `RINGDESK_GEMINI_API_KEY` /
///   `RINGDESK_GROQ_API_KEY` override the dialogue provider credentials
/// - `RINGDESK_SHEET_URL` / `RINGDESK_ALERT_URL` override the notification
///   channel endpoints
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("RINGDESK_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("RINGDESK_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("RINGDESK_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("RINGDESK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("RINGDESK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(number) = std::env::var("RINGDESK_OPERATOR_NUMBER") {
        config.telephony.operator_number = number;
    }
    if let Ok(url) = std::env::var("RINGDESK_SPEECH_URL") {
        config.speech.base_url = url;
    }
    if let Ok(key) = std::env::var("RINGDESK_SPEECH_API_KEY") {
        config.speech.api_key = Some(key);
    }
    if let Ok(key) = std::env::var("RINGDESK_OPENAI_API_KEY") {
        config.dialogue.openai_api_key = Some(key);
    }
    if let Ok(key) = std::env::var("RINGDESK_GEMINI_API_KEY") {
        config.dialogue.gemini_api_key = Some(key);
    }
    if let Ok(key) = std::env::var("RINGDESK_GROQ_API_KEY") {
        config.dialogue.groq_api_key = Some(key);
    }
    if let Ok(url) = std::env::var("RINGDESK_SHEET_URL") {
        config.notify.sheet_url = Some(url);
    }
    if let Ok(url) = std::env::var("RINGDESK_ALERT_URL") {
        config.notify.alert_url = Some(url);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "ringdesk.db");
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window_secs, 60);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8081

            [telephony]
            operator_number = "+998901234567"

            [dialogue]
            groq_api_key = "gsk-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.telephony.operator_number, "+998901234567");
        assert_eq!(config.telephony.transfer_timeout_secs, 30);
        assert_eq!(config.dialogue.groq_api_key.as_deref(), Some("gsk-test"));
        assert_eq!(config.logging.level, "info");
    }
}
