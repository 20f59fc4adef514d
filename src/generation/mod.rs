pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiGenerator;
pub use prompt::ContextPassage;

/// Error types for answer generation
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

/// Outcome of a generation backend connectivity probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeStatus {
    pub success: bool,
    pub message: String,
    pub model: String,
}

/// Trait for hosted LLM providers composing grounded answers
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Compose an answer to `question` grounded in the given passages.
    ///
    /// Passages are expected in rank order; the provider selects as many as
    /// fit its context token budget, highest-ranked first.
    async fn generate_answer(
        &self,
        question: &str,
        context: &[ContextPassage],
    ) -> Result<String, GenerationError>;

    /// Suggest follow-up questions for `question` given the passages.
    ///
    /// Returns an empty list when there is no context to draw from.
    async fn suggest_follow_ups(
        &self,
        question: &str,
        context: &[ContextPassage],
    ) -> Result<Vec<String>, GenerationError>;

    /// Probe backend connectivity with a minimal generation call
    async fn probe(&self) -> ProbeStatus;

    /// Get the model name
    fn model_name(&self) -> &str;
}
