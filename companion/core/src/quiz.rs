//! Quiz Engine
//!
//! Question sequencing with one-shot answers:
//!
//! ```text
//!  unanswered ──select_option──► revealed ──next──► unanswered (next question)
//!                                    │
//!                                    └──next on last──► finished ──reset──► question 1
//! ```

use serde::{Deserialize, Serialize};

use crate::content::QuizQuestion;
use crate::outcome::{Outcome, StateConflict};

/// Observable quiz progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizState {
    /// Fixed question list
    pub questions: Vec<QuizQuestion>,
    /// Index of the question on screen
    pub current_index: usize,
    /// Correct answers so far
    pub score: usize,
    /// Option chosen for the current question
    pub selected_option: Option<usize>,
    /// Whether the current answer has been revealed
    pub revealed: bool,
    /// Whether every question has been answered
    pub finished: bool,
}

impl QuizState {
    fn fresh(questions: Vec<QuizQuestion>) -> Self {
        let finished = questions.is_empty();
        Self {
            questions,
            current_index: 0,
            score: 0,
            selected_option: None,
            revealed: false,
            finished,
        }
    }

    /// Question on screen, if any
    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current_index)
    }

    /// Score as a rounded percentage, once finished
    #[must_use]
    pub fn percentage(&self) -> Option<u32> {
        if !self.finished {
            return None;
        }
        let total = self.questions.len();
        if total == 0 {
            return Some(0);
        }
        // round half up: (200 * score + total) / (2 * total)
        let rounded = (200 * self.score + total) / (2 * total);
        Some(u32::try_from(rounded).unwrap_or(100))
    }

    /// `(question number, total)`, 1-based
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        let total = self.questions.len();
        ((self.current_index + 1).min(total), total)
    }

    /// Presentation of option `index` of the current question
    #[must_use]
    pub fn option_verdict(&self, index: usize) -> OptionVerdict {
        let Some(question) = self.questions.get(self.current_index) else {
            return OptionVerdict::Pending;
        };
        if !self.revealed {
            return OptionVerdict::Pending;
        }
        if index == question.correct_option {
            OptionVerdict::Correct
        } else if self.selected_option == Some(index) {
            OptionVerdict::WrongSelection
        } else {
            OptionVerdict::Dimmed
        }
    }

    /// Explanation of the current question, once revealed
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        if !self.revealed || self.finished {
            return None;
        }
        self.current_question().map(|q| q.explanation.as_str())
    }
}

/// How an option should be presented after reveal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionVerdict {
    /// Not revealed yet
    Pending,
    /// The correct option
    Correct,
    /// The option the student chose, which was wrong
    WrongSelection,
    /// Any other option
    Dimmed,
}

/// Drives a [`QuizState`]
#[derive(Debug)]
pub struct QuizEngine {
    state: QuizState,
}

impl QuizEngine {
    /// Start a quiz over `questions`
    ///
    /// An empty list is finished from the start.
    #[must_use]
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            state: QuizState::fresh(questions),
        }
    }

    /// Current observable state
    #[must_use]
    pub fn state(&self) -> &QuizState {
        &self.state
    }

    /// Answer the current question
    ///
    /// Returns whether the answer was correct. A question can be answered
    /// once.
    pub fn select_option(&mut self, index: usize) -> Outcome<bool> {
        if self.state.finished {
            return Err(StateConflict::QuizFinished);
        }
        if self.state.revealed {
            return Err(StateConflict::AlreadyAnswered);
        }
        let question = self
            .state
            .questions
            .get(self.state.current_index)
            .ok_or(StateConflict::QuizFinished)?;
        if index >= question.options.len() {
            return Err(StateConflict::OptionOutOfRange);
        }

        let correct = index == question.correct_option;
        self.state.selected_option = Some(index);
        self.state.revealed = true;
        if correct {
            self.state.score += 1;
        }
        tracing::debug!(
            question = self.state.current_index,
            option = index,
            correct,
            score = self.state.score,
            "Quiz answer locked"
        );
        Ok(correct)
    }

    /// Move past a revealed question
    pub fn next(&mut self) -> Outcome {
        if self.state.finished {
            return Err(StateConflict::QuizFinished);
        }
        if !self.state.revealed {
            return Err(StateConflict::NotRevealed);
        }

        self.state.current_index += 1;
        if self.state.current_index >= self.state.questions.len() {
            self.state.finished = true;
            tracing::info!(
                score = self.state.score,
                total = self.state.questions.len(),
                "Quiz finished"
            );
        } else {
            self.state.selected_option = None;
            self.state.revealed = false;
        }
        Ok(())
    }

    /// Start over from the first question
    pub fn reset(&mut self) {
        let questions = std::mem::take(&mut self.state.questions);
        self.state = QuizState::fresh(questions);
    }

    /// Question on screen, if any
    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.state.current_question()
    }

    /// Score as a rounded percentage, once finished
    #[must_use]
    pub fn percentage(&self) -> Option<u32> {
        self.state.percentage()
    }

    /// `(question number, total)`, 1-based
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        self.state.progress()
    }

    /// Presentation of option `index` of the current question
    #[must_use]
    pub fn option_verdict(&self, index: usize) -> OptionVerdict {
        self.state.option_verdict(index)
    }

    /// Explanation of the current question, once revealed
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.state.explanation()
    }
}
