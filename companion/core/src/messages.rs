//! Companion Messages
//!
//! Messages sent from the engine to the presentation surface. Every state
//! change is published as a full snapshot of the affected session, so a
//! surface can render without keeping its own model.

use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatStatus};
use crate::explanation::ExplanationState;
use crate::quiz::QuizState;
use crate::speech::SpeechState;

/// Messages from the engine to a surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CompanionMessage {
    /// The explanation panel changed
    Explanation(ExplanationState),

    /// The narration slot changed
    Speech(SpeechState),

    /// The tutor conversation changed
    Chat {
        /// Full message log
        messages: Vec<ChatMessage>,
        /// Whether an answer is pending
        status: ChatStatus,
    },

    /// Quiz progress changed
    Quiz(QuizState),

    /// System notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },

    /// Request surface to quit
    Quit {
        /// Optional goodbye message
        message: Option<String>,
    },
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}
