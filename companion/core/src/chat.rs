//! Tutor Chat Session
//!
//! Ordered message log with optimistic user messages. Each send captures the
//! session generation; a reset bumps it, so an answer that arrives after a
//! reset never lands in the fresh conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::PromptPayload;
use crate::error::ServiceError;
use crate::outcome::{CompletionOutcome, Generation, Outcome, StateConflict};

/// First assistant message of a fresh session
pub const DEFAULT_GREETING: &str =
    "你好！我是你的助教。对《滕王阁序》中的字词、典故或意境有任何疑问，都可以问我哦。";

/// Assistant message seeded by a reset
pub const DEFAULT_RESET_GREETING: &str = "对话已重置。有什么我可以帮你的吗？";

/// Appended when the service call failed
pub const TUTOR_FAILURE: &str = "抱歉，我现在有点走神，请再试一次。";

/// Appended when the service answered without text
pub const TUTOR_EMPTY: &str = "这个问题太深奥了，让我再思考一下。";

/// Author of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The student
    User,
    /// The tutor
    Assistant,
}

/// One immutable entry of the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Whether an answer is pending
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatStatus {
    /// Ready for the next question
    #[default]
    Idle,
    /// A tutor answer is in flight
    Awaiting,
}

/// Seed and fallback copy for the conversation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatCopy {
    /// Seeds a new session
    pub greeting: String,
    /// Seeds a reset session
    pub reset_greeting: String,
    /// Appended on transport or remote failure
    pub failure: String,
    /// Appended when the service returned no text
    pub empty: String,
}

impl Default for ChatCopy {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            reset_greeting: DEFAULT_RESET_GREETING.to_string(),
            failure: TUTOR_FAILURE.to_string(),
            empty: TUTOR_EMPTY.to_string(),
        }
    }
}

/// Identity of one tutor request, carrying the prompt to send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTicket {
    generation: Generation,
    payload: PromptPayload,
}

impl ChatTicket {
    /// Session generation at issue time
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Prompt payload for the gateway
    #[must_use]
    pub fn payload(&self) -> &PromptPayload {
        &self.payload
    }
}

/// Conversation with the tutor
#[derive(Debug)]
pub struct TutorChat {
    messages: Vec<ChatMessage>,
    status: ChatStatus,
    generation: Generation,
    context: String,
    copy: ChatCopy,
}

impl TutorChat {
    /// Start a conversation grounded in `context`, the full text of the work
    pub fn new(context: impl Into<String>, copy: ChatCopy) -> Self {
        let messages = vec![ChatMessage::new(MessageRole::Assistant, copy.greeting.clone())];
        Self {
            messages,
            status: ChatStatus::Idle,
            generation: Generation::default(),
            context: context.into(),
            copy,
        }
    }

    /// Messages in order of appearance
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ChatStatus {
        self.status
    }

    /// Append the student's question and start awaiting the tutor
    ///
    /// The question is trimmed; empty input and sends while awaiting are
    /// rejected without touching the log.
    pub fn send(&mut self, text: &str) -> Outcome<ChatTicket> {
        let question = text.trim();
        if question.is_empty() {
            return Err(StateConflict::EmptyMessage);
        }
        if self.status == ChatStatus::Awaiting {
            return Err(StateConflict::ChatAwaiting);
        }

        let generation = self.generation.bump();
        self.messages
            .push(ChatMessage::new(MessageRole::User, question));
        self.status = ChatStatus::Awaiting;
        tracing::debug!(%generation, messages = self.messages.len(), "Tutor question sent");

        Ok(ChatTicket {
            generation,
            payload: PromptPayload::TutorAnswer {
                question: question.to_string(),
                context: self.context.clone(),
            },
        })
    }

    /// Whether an answer for `ticket` would still be appended
    #[must_use]
    pub fn is_current(&self, ticket: &ChatTicket) -> bool {
        ticket.generation == self.generation && self.status == ChatStatus::Awaiting
    }

    /// Append the tutor's answer, or fallback copy on failure
    pub fn complete(
        &mut self,
        ticket: &ChatTicket,
        result: Result<String, ServiceError>,
    ) -> CompletionOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(generation = %ticket.generation, "Discarding stale tutor answer");
            return CompletionOutcome::Discarded;
        }

        let content = match result {
            Ok(text) => text,
            Err(ServiceError::EmptyResponse) => self.copy.empty.clone(),
            Err(error) => {
                tracing::warn!(%error, "Tutor request failed");
                self.copy.failure.clone()
            }
        };
        self.messages
            .push(ChatMessage::new(MessageRole::Assistant, content));
        self.status = ChatStatus::Idle;
        CompletionOutcome::Applied
    }

    /// Replace the history with the reset greeting
    pub fn reset(&mut self) {
        let generation = self.generation.bump();
        self.messages = vec![ChatMessage::new(
            MessageRole::Assistant,
            self.copy.reset_greeting.clone(),
        )];
        self.status = ChatStatus::Idle;
        tracing::debug!(%generation, "Tutor chat reset");
    }
}
