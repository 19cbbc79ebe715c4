//! Study Events
//!
//! Events sent from a surface to the engine. Surfaces forward what the
//! student did; the engine decides what it means.

use serde::{Deserialize, Serialize};

/// Top-level views of the study surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    /// Original text with annotations
    #[default]
    Reading,
    /// Translation and analysis
    Analysis,
    /// Tutor conversation
    Tutor,
    /// Quiz
    Quiz,
}

/// Events from a surface to the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyEvent {
    /// Ask for an explanation of a paragraph
    Explain {
        /// Passage id
        paragraph_id: u32,
    },

    /// Close the explanation panel
    DismissExplanation,

    /// Narrate a paragraph
    Speak {
        /// Passage id
        paragraph_id: u32,
    },

    /// Stop narration
    StopSpeech,

    /// Ask the tutor a question
    SendChat {
        /// The question as typed
        text: String,
    },

    /// Clear the tutor conversation
    ResetChat,

    /// Answer the current quiz question
    SelectOption {
        /// Zero-based option index
        index: usize,
    },

    /// Advance to the next quiz question
    NextQuestion,

    /// Restart the quiz
    ResetQuiz,

    /// Switch to another view
    Navigate {
        /// Target view
        section: Section,
    },

    /// Leave the application
    Quit,
}
