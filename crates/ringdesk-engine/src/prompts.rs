//! Scripted prompts spoken by the system itself.
//!
//! These are fixed texts, not model output. The menu texts are bilingual
//! because they play before the caller has picked a language; everything
//! after the menu is Russian, the language of the AI conversation path.

/// Language menu offered at call start.
pub const MENU_PROMPT: &str = "Здравствуйте! Вы позвонили в нашу клинику. \
Для продолжения на русском языке нажмите один. \
O'zbek tilida davom etish uchun ikkini bosing.";

/// Re-prompt for a digit outside the menu.
pub const MENU_INVALID_PROMPT: &str =
    "Пожалуйста, нажмите один или два. Iltimos, bir yoki ikkini bosing.";

/// First AI utterance after the caller picks Russian.
pub const AI_GREETING: &str =
    "Вы выбрали русский язык. Я помощник клиники. Чем могу вам помочь?";

/// Spoken while the blind transfer to the operator is set up.
pub const TRANSFER_MESSAGE: &str =
    "Operatorga ulanmoqdasiz, iltimos kuting. Перевожу вас на оператора, оставайтесь на линии.";

/// Fallback when speech recognition fails or hears nothing.
pub const STT_RETRY_PROMPT: &str =
    "Извините, я вас не расслышал. Повторите, пожалуйста, ещё раз.";

/// Fallback when the dialogue engine fails.
pub const LLM_APOLOGY: &str = "Извините, произошла техническая ошибка. \
Пожалуйста, повторите ваш вопрос.";

/// Closing line reported on call-end.
pub const CALL_END_MESSAGE: &str = "Спасибо за звонок. Всего доброго!";

/// TTS voice used for every scripted and generated reply.
pub const DEFAULT_VOICE: &str = "alena";

/// Menu timing advertised to the telephony provider.
pub const MENU_TIMEOUT_SECS: u32 = 10;
pub const MENU_NUM_DIGITS: u32 = 1;
/// Advertised to the provider only; no server-side counter enforces it.
pub const MENU_RETRIES: u32 = 2;
