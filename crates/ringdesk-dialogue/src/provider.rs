//! Language-model provider clients.
//!
//! OpenAI and Groq speak the same chat-completions wire shape and share one
//! client; Gemini uses its `generateContent` shape. The active client is
//! built once from configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{DialogueConfig, ProviderKind};
use crate::error::DialogueError;
use crate::prompt::ChatMessage;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Caps the reply at roughly 100 words of Russian text.
const MAX_COMPLETION_TOKENS: u32 = 256;

/// The active provider client.
#[derive(Debug)]
pub enum ProviderClient {
    OpenAiCompatible(OpenAiCompatibleClient),
    Gemini(GeminiClient),
}

impl ProviderClient {
    /// Resolves and builds the active client from configuration.
    pub fn resolve(config: &DialogueConfig) -> Result<Self, DialogueError> {
        let (kind, api_key) = config.resolve_provider()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DialogueError::Config(format!("failed to build http client: {e}")))?;

        let client = match kind {
            ProviderKind::OpenAi => Self::OpenAiCompatible(OpenAiCompatibleClient {
                kind,
                api_key,
                base_url: base_url_for(config, OPENAI_BASE_URL),
                model: model_for(config, OPENAI_DEFAULT_MODEL),
                http,
            }),
            ProviderKind::Groq => Self::OpenAiCompatible(OpenAiCompatibleClient {
                kind,
                api_key,
                base_url: base_url_for(config, GROQ_BASE_URL),
                model: model_for(config, GROQ_DEFAULT_MODEL),
                http,
            }),
            ProviderKind::Gemini => Self::Gemini(GeminiClient {
                api_key,
                base_url: base_url_for(config, GEMINI_BASE_URL),
                model: model_for(config, GEMINI_DEFAULT_MODEL),
                http,
            }),
        };

        Ok(client)
    }

    /// The kind of the active provider.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAiCompatible(client) => client.kind,
            Self::Gemini(_) => ProviderKind::Gemini,
        }
    }

    /// Requests one completion for the given messages.
    ///
    /// # Errors
    ///
    /// Returns `DialogueError::Request` for transport faults and non-2xx
    /// statuses, `DialogueError::MalformedResponse` when the body cannot be
    /// interpreted.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, DialogueError> {
        match self {
            Self::OpenAiCompatible(client) => client.complete(messages).await,
            Self::Gemini(client) => client.complete(messages).await,
        }
    }
}

fn base_url_for(config: &DialogueConfig, default: &str) -> String {
    config
        .base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

fn model_for(config: &DialogueConfig, default: &str) -> String {
    config.model.clone().unwrap_or_else(|| default.to_string())
}

// ── OpenAI-compatible (OpenAI, Groq) ─────────────────────────────────

#[derive(Debug)]
pub struct OpenAiCompatibleClient {
    kind: ProviderKind,
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, DialogueError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: 0.3,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DialogueError::Request(format!("{}: {e}", self.kind.as_str())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DialogueError::Request(format!(
                "{} returned {status}: {body}",
                self.kind.as_str()
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                DialogueError::MalformedResponse("completion has no choices".to_string())
            })
    }
}

// ── Gemini ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, DialogueError> {
        // Gemini takes the system instruction out of band; conversation roles
        // are "user" and "model".
        let mut system_text = String::new();
        let mut contents = Vec::new();
        for message in messages {
            match message.role.as_str() {
                "system" => system_text = message.content.clone(),
                "assistant" => contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![GeminiPart {
                        text: message.content.clone(),
                    }],
                }),
                _ => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart {
                        text: message.content.clone(),
                    }],
                }),
            }
        }

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system_text }],
            },
            contents,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: MAX_COMPLETION_TOKENS,
                temperature: 0.3,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DialogueError::Request(format!("gemini: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DialogueError::Request(format!(
                "gemini returned {status}: {body}"
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| DialogueError::MalformedResponse(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                DialogueError::MalformedResponse("response has no candidates".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_builds_openai_compatible_for_groq() {
        let config = DialogueConfig {
            groq_api_key: Some("q-key".to_string()),
            ..Default::default()
        };
        let client = ProviderClient::resolve(&config).unwrap();
        assert_eq!(client.kind(), ProviderKind::Groq);
    }

    #[test]
    fn base_url_override_applies() {
        let config = DialogueConfig {
            openai_api_key: Some("sk-key".to_string()),
            base_url: Some("http://localhost:11434/v1/".to_string()),
            ..Default::default()
        };
        match ProviderClient::resolve(&config).unwrap() {
            ProviderClient::OpenAiCompatible(client) => {
                assert_eq!(client.base_url, "http://localhost:11434/v1");
            }
            other => panic!("expected OpenAI-compatible client, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_request_error() {
        let config = DialogueConfig {
            openai_api_key: Some("sk-key".to_string()),
            base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            ..Default::default()
        };
        let client = ProviderClient::resolve(&config).unwrap();
        let messages = vec![ChatMessage::system("test")];

        match client.complete(&messages).await {
            Err(DialogueError::Request(_)) => {}
            other => panic!("expected Request error, got {other:?}"),
        }
    }
}
