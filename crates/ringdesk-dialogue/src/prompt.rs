//! Prompt assembly: the fixed system instruction plus a bounded context
//! window over the call transcript.

use ringdesk_types::{TranscriptTurn, TurnRole};
use serde::Serialize;

/// The non-negotiable system instruction prepended to every completion
/// request. It enumerates the forbidden topics, mandates the reply language,
/// caps reply length, and requires the assistant to always offer further
/// help.
pub const SYSTEM_INSTRUCTION: &str = "\
Ты — вежливый телефонный администратор клиники. Отвечай только по-русски.

Строгие запреты, без исключений:
- не давай медицинских советов, диагнозов и рекомендаций по лечению;
- не называй цены и стоимость услуг, даже приблизительно;
- не обещай и не гарантируй результат лечения или приёма.

Если вопрос касается запрещённой темы, предложи соединить с оператором.
Отвечай коротко, не более 100 слов. В конце ответа всегда предлагай помочь \
с чем-нибудь ещё.";

/// One message in the provider-facing conversation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Builds the message list for a completion request.
///
/// The system instruction always comes first; after it come the last
/// `max_context_turns` transcript turns in call-chronological order. Bounding
/// the window keeps prompt size independent of call length.
pub fn build_messages(transcript: &[TranscriptTurn], max_context_turns: usize) -> Vec<ChatMessage> {
    let start = transcript.len().saturating_sub(max_context_turns);

    let mut messages = Vec::with_capacity(transcript.len() - start + 1);
    messages.push(ChatMessage::system(SYSTEM_INSTRUCTION));

    for turn in &transcript[start..] {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        };
        messages.push(ChatMessage {
            role: role.to_string(),
            content: turn.content.clone(),
        });
    }

    messages
}
