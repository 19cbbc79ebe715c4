//! Request identity and action outcomes.
//!
//! Every session hands out a ticket when it starts asynchronous work. The
//! ticket carries the session's [`Generation`] at issue time; a completion is
//! applied only if the generation still matches when it arrives. Dismissal,
//! reset and navigation bump the generation, which is how in-flight work is
//! superseded without cancelling the remote call.

use serde::{Deserialize, Serialize};

/// Monotonic identity of a session's current request window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    /// Advance to the next generation, returning it
    pub fn bump(&mut self) -> Self {
        self.0 = self.0.wrapping_add(1);
        *self
    }

    /// Raw counter value
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen_{}", self.0)
    }
}

/// Why an action was turned into a no-op
///
/// Conflicts are silent towards the user; callers may log or test them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateConflict {
    /// An explanation is already loading
    ExplanationLoading,
    /// A paragraph is already being synthesized or played
    SpeechInFlight,
    /// The audio device still plays a previous buffer
    AudioBusy,
    /// A tutor answer is still awaited
    ChatAwaiting,
    /// The chat message was empty or whitespace
    EmptyMessage,
    /// The current question was already answered
    AlreadyAnswered,
    /// The answer has not been revealed yet
    NotRevealed,
    /// The option index does not exist for the current question
    OptionOutOfRange,
    /// The quiz has no further questions
    QuizFinished,
    /// No passage with that id exists
    UnknownParagraph,
}

impl std::fmt::Display for StateConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::ExplanationLoading => "an explanation is already loading",
            Self::SpeechInFlight => "a paragraph is already being narrated",
            Self::AudioBusy => "audio output is still playing",
            Self::ChatAwaiting => "still waiting for the tutor",
            Self::EmptyMessage => "message is empty",
            Self::AlreadyAnswered => "question already answered",
            Self::NotRevealed => "answer not revealed yet",
            Self::OptionOutOfRange => "no such option",
            Self::QuizFinished => "quiz is finished",
            Self::UnknownParagraph => "no such paragraph",
        };
        f.write_str(reason)
    }
}

/// Result of an action that may be rejected
pub type Outcome<T = ()> = Result<T, StateConflict>;

/// What happened to an asynchronous completion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The completion mutated session state
    Applied,
    /// The session moved on; the completion was dropped
    Discarded,
}

impl CompletionOutcome {
    /// Whether the completion was applied
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
