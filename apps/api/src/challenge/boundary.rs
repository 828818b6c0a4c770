//! Traits for the external collaborators of the challenge engine.
//!
//! `LlmClient` implements both in production; tests use scripted fakes.

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a call to the generation or judging service.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("service returned an empty response")]
    EmptyResponse,
}

/// Turns a player's prompt into response text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt_text: &str) -> Result<String, GenerationError>;
}

/// Produces a free-text judgment of `candidate` against `question`.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, question: &str, candidate: &str) -> Result<String, GenerationError>;
}
