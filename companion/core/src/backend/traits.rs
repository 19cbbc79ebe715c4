//! AI Gateway Traits
//!
//! The [`AiGateway`] trait lets the sessions work against any provider (or a
//! scripted test double) without changing their logic.

use async_trait::async_trait;

use crate::error::ServiceError;

/// Which prompt template a text request uses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Explain a passage
    Explain,
    /// Answer a student's question
    TutorAnswer,
}

/// Caller-supplied variable content for a text request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptPayload {
    /// Explain one passage
    Explain {
        /// The passage text
        passage: String,
    },
    /// Answer a tutoring question against the full text
    TutorAnswer {
        /// The student's question
        question: String,
        /// The full text of the work
        context: String,
    },
}

impl PromptPayload {
    /// The template this payload fills
    #[must_use]
    pub fn kind(&self) -> PromptKind {
        match self {
            Self::Explain { .. } => PromptKind::Explain,
            Self::TutorAnswer { .. } => PromptKind::TutorAnswer,
        }
    }
}

/// AI Gateway trait
///
/// Implement this trait to add support for a different generative AI
/// provider.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Get the gateway name (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Check if the service is reachable with the configured credentials
    async fn health_check(&self) -> bool;

    /// Build the prompt for `payload` and return the generated text
    async fn generate_text(&self, payload: &PromptPayload) -> Result<String, ServiceError>;

    /// Synthesize narration of `text`
    ///
    /// Returns raw little-endian PCM bytes, or `None` when the service
    /// answered without audio (a valid, empty result).
    async fn synthesize_speech(&self, text: &str) -> Result<Option<Vec<u8>>, ServiceError>;
}
