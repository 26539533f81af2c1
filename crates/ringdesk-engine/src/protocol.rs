//! Webhook request and response payloads exchanged with the telephony
//! provider.
//!
//! Field naming follows the provider's JSON contract: camelCase on the
//! request side and inside instruction messages, snake_case inside config
//! blocks.

use serde::{Deserialize, Serialize};
use ringdesk_types::{Language, Outcome};

/// `POST /webhook/call-start` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStartRequest {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `POST /webhook/call-input` request body, covering both DTMF and speech.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInputRequest {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub input_type: Option<String>,
    /// DTMF digit when `input_type` is `dtmf`.
    #[serde(default)]
    pub input: Option<String>,
    /// Base64 audio when `input_type` is `speech`.
    #[serde(default)]
    pub audio_data: Option<String>,
}

/// `POST /webhook/call-end` request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndRequest {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub end_reason: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One digit option in the language menu.
#[derive(Debug, Clone, Serialize)]
pub struct DtmfOption {
    pub digit: String,
    pub action: String,
    pub label: String,
}

/// The gather instruction payload: a DTMF menu for the provider to play.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DtmfMenu {
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub options: Vec<DtmfOption>,
    pub timeout: u32,
    pub num_digits: u32,
    pub retries: u32,
    pub invalid_prompt: String,
}

/// `call-start` response: tell the provider to gather a digit.
#[derive(Debug, Clone, Serialize)]
pub struct CallStartResponse {
    pub success: bool,
    pub action: String,
    pub message: DtmfMenu,
}

/// Speech-recognition settings sent with `start_conversation`.
#[derive(Debug, Clone, Serialize)]
pub struct SttSessionConfig {
    pub stt_enabled: bool,
    pub stt_language: String,
    pub continuous_listening: bool,
}

/// Blind-transfer settings sent with `transfer`.
#[derive(Debug, Clone, Serialize)]
pub struct TransferInstruction {
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timeout: u32,
}

/// A reply for the provider to synthesize and play.
#[derive(Debug, Clone, Serialize)]
pub struct SpokenMessage {
    pub text: String,
    pub language: Language,
    pub voice: String,
}

/// Listening behavior after a `continue` response.
#[derive(Debug, Clone, Serialize)]
pub struct ListenConfig {
    pub continue_listening: bool,
}

/// `call-input` response instruction set.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InputAction {
    /// Digit `1`: open the AI conversation.
    StartConversation {
        message: String,
        config: SttSessionConfig,
    },
    /// Digit `2`: blind transfer to the operator.
    Transfer {
        message: String,
        transfer: TransferInstruction,
    },
    /// Any other digit: replay the menu.
    Retry { message: String },
    /// Speech turn: play a reply and keep the conversation open.
    Continue {
        message: SpokenMessage,
        config: ListenConfig,
    },
}

/// `call-end` response body.
#[derive(Debug, Clone, Serialize)]
pub struct CallEndResponse {
    pub success: bool,
    pub message: String,
    pub call_id: String,
    pub outcome: Outcome,
    pub duration: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_request_accepts_both_shapes() {
        let dtmf: CallInputRequest =
            serde_json::from_str(r#"{"callId":"abc123","inputType":"dtmf","input":"1"}"#).unwrap();
        assert_eq!(dtmf.input.as_deref(), Some("1"));
        assert!(dtmf.audio_data.is_none());

        let speech: CallInputRequest = serde_json::from_str(
            r#"{"callId":"abc123","inputType":"speech","audioData":"AAAA"}"#,
        )
        .unwrap();
        assert_eq!(speech.input_type.as_deref(), Some("speech"));
        assert_eq!(speech.audio_data.as_deref(), Some("AAAA"));
    }

    #[test]
    fn actions_serialize_with_snake_case_tags() {
        let action = InputAction::StartConversation {
            message: "привет".to_string(),
            config: SttSessionConfig {
                stt_enabled: true,
                stt_language: "ru-RU".to_string(),
                continuous_listening: true,
            },
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "start_conversation");
        assert_eq!(json["config"]["stt_language"], "ru-RU");

        let transfer = InputAction::Transfer {
            message: "перевожу".to_string(),
            transfer: TransferInstruction {
                to: "+998901112233".to_string(),
                kind: "blind".to_string(),
                timeout: 30,
            },
        };
        let json = serde_json::to_value(&transfer).unwrap();
        assert_eq!(json["action"], "transfer");
        assert_eq!(json["transfer"]["type"], "blind");
    }

    #[test]
    fn menu_serializes_provider_field_names() {
        let menu = DtmfMenu {
            kind: "dtmf_menu".to_string(),
            prompt: "меню".to_string(),
            options: vec![DtmfOption {
                digit: "1".to_string(),
                action: "russian_ai".to_string(),
                label: "Русский".to_string(),
            }],
            timeout: 10,
            num_digits: 1,
            retries: 2,
            invalid_prompt: "ещё раз".to_string(),
        };
        let json = serde_json::to_value(&menu).unwrap();
        assert_eq!(json["type"], "dtmf_menu");
        assert!(json.get("numDigits").is_some());
        assert!(json.get("invalidPrompt").is_some());
    }
}
