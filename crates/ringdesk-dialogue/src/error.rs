use thiserror::Error;

/// Errors that can occur inside the dialogue engine.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// No provider credential is configured; the engine cannot start.
    #[error("no dialogue provider configured: set an OpenAI, Gemini, or Groq API key")]
    NoProvider,

    #[error("invalid dialogue configuration: {0}")]
    Config(String),

    /// Transport failure, timeout, or non-2xx from the active provider.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The provider responded 2xx but the body did not match the expected
    /// completion shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}
