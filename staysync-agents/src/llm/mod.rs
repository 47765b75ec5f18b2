pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A text-to-JSON completion service.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the raw text of the model's answer. The caller parses it.
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}
