//! Explanation Session
//!
//! Per-paragraph request lifecycle:
//!
//! ```text
//!  Idle ──request──► Loading ──complete──► Ready | Error
//!   ▲                   │                      │
//!   └─────dismiss───────┴──────────────────────┘
//! ```
//!
//! At most one explanation is loading or shown at a time. Dismissal bumps
//! the session generation so a late completion is discarded.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::outcome::{CompletionOutcome, Generation, Outcome, StateConflict};

/// Shown when the service call failed
pub const EXPLANATION_FAILURE: &str = "服务连接失败，请稍后再试。";

/// Shown when the service answered without text
pub const EXPLANATION_EMPTY: &str = "抱歉，我暂时无法解释这段文字。";

/// Lifecycle status of the explanation panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplanationStatus {
    /// Nothing requested
    #[default]
    Idle,
    /// Waiting for the service
    Loading,
    /// Explanation text available
    Ready,
    /// The request failed; fallback copy is shown
    Error,
}

/// Observable explanation state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationState {
    /// Paragraph being explained
    pub active_paragraph_id: Option<u32>,
    /// Lifecycle status
    pub status: ExplanationStatus,
    /// Explanation or fallback text; absent while loading
    pub text: Option<String>,
}

/// User-facing fallback copy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplanationCopy {
    /// Written on transport or remote failure
    pub failure: String,
    /// Written when the service returned no text
    pub empty: String,
}

impl Default for ExplanationCopy {
    fn default() -> Self {
        Self {
            failure: EXPLANATION_FAILURE.to_string(),
            empty: EXPLANATION_EMPTY.to_string(),
        }
    }
}

/// Identity of one explanation request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExplanationTicket {
    paragraph_id: u32,
    generation: Generation,
}

impl ExplanationTicket {
    /// Paragraph the request is for
    #[must_use]
    pub fn paragraph_id(&self) -> u32 {
        self.paragraph_id
    }

    /// Session generation at issue time
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Owns [`ExplanationState`] and enforces single-flight
#[derive(Debug, Default)]
pub struct ExplanationSession {
    state: ExplanationState,
    generation: Generation,
    copy: ExplanationCopy,
}

impl ExplanationSession {
    /// Create an idle session with custom fallback copy
    #[must_use]
    pub fn new(copy: ExplanationCopy) -> Self {
        Self {
            state: ExplanationState::default(),
            generation: Generation::default(),
            copy,
        }
    }

    /// Current observable state
    #[must_use]
    pub fn state(&self) -> &ExplanationState {
        &self.state
    }

    /// Start loading an explanation for `paragraph_id`
    ///
    /// Rejected while any explanation is loading. Selecting a paragraph while
    /// another one is shown replaces it.
    pub fn request(&mut self, paragraph_id: u32) -> Outcome<ExplanationTicket> {
        if self.state.status == ExplanationStatus::Loading {
            return Err(StateConflict::ExplanationLoading);
        }

        let generation = self.generation.bump();
        self.state = ExplanationState {
            active_paragraph_id: Some(paragraph_id),
            status: ExplanationStatus::Loading,
            text: None,
        };
        tracing::debug!(paragraph_id, %generation, "Explanation loading");

        Ok(ExplanationTicket {
            paragraph_id,
            generation,
        })
    }

    /// Whether a completion for `ticket` would still be applied
    #[must_use]
    pub fn is_current(&self, ticket: &ExplanationTicket) -> bool {
        ticket.generation == self.generation
            && self.state.status == ExplanationStatus::Loading
            && self.state.active_paragraph_id == Some(ticket.paragraph_id)
    }

    /// Apply the service result for `ticket`
    ///
    /// Failures are swallowed into fallback copy. A stale ticket leaves the
    /// state untouched.
    pub fn complete(
        &mut self,
        ticket: ExplanationTicket,
        result: Result<String, ServiceError>,
    ) -> CompletionOutcome {
        if !self.is_current(&ticket) {
            tracing::debug!(
                paragraph_id = ticket.paragraph_id,
                generation = %ticket.generation,
                "Discarding stale explanation"
            );
            return CompletionOutcome::Discarded;
        }

        let (status, text) = match result {
            Ok(text) => (ExplanationStatus::Ready, text),
            Err(ServiceError::EmptyResponse) => (ExplanationStatus::Ready, self.copy.empty.clone()),
            Err(error) => {
                tracing::warn!(paragraph_id = ticket.paragraph_id, %error, "Explanation failed");
                (ExplanationStatus::Error, self.copy.failure.clone())
            }
        };

        self.state.status = status;
        self.state.text = Some(text);
        CompletionOutcome::Applied
    }

    /// Clear the panel and supersede any pending request
    pub fn dismiss(&mut self) {
        let generation = self.generation.bump();
        if self.state.active_paragraph_id.is_some() {
            tracing::debug!(%generation, "Explanation dismissed");
        }
        self.state = ExplanationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_then_ready() {
        let mut session = ExplanationSession::default();
        let ticket = session.request(1).unwrap();

        assert_eq!(session.state().status, ExplanationStatus::Loading);
        assert_eq!(session.state().active_paragraph_id, Some(1));
        assert_eq!(session.state().text, None);

        let outcome = session.complete(ticket, Ok("解释".to_string()));
        assert_eq!(outcome, CompletionOutcome::Applied);
        assert_eq!(
            session.state(),
            &ExplanationState {
                active_paragraph_id: Some(1),
                status: ExplanationStatus::Ready,
                text: Some("解释".to_string()),
            }
        );
    }

    #[test]
    fn test_second_request_while_loading_is_noop() {
        let mut session = ExplanationSession::default();
        session.request(1).unwrap();
        let before = session.state().clone();

        assert_eq!(session.request(2), Err(StateConflict::ExplanationLoading));
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn test_failure_uses_fallback() {
        let mut session = ExplanationSession::default();
        let ticket = session.request(3).unwrap();
        session.complete(ticket, Err(ServiceError::Transport("reset".into())));

        assert_eq!(session.state().status, ExplanationStatus::Error);
        assert_eq!(session.state().text.as_deref(), Some(EXPLANATION_FAILURE));
    }

    #[test]
    fn test_empty_response_uses_empty_copy() {
        let mut session = ExplanationSession::default();
        let ticket = session.request(3).unwrap();
        session.complete(ticket, Err(ServiceError::EmptyResponse));

        assert_eq!(session.state().status, ExplanationStatus::Ready);
        assert_eq!(session.state().text.as_deref(), Some(EXPLANATION_EMPTY));
    }

    #[test]
    fn test_dismiss_discards_late_result() {
        let mut session = ExplanationSession::default();
        let ticket = session.request(1).unwrap();
        session.dismiss();

        assert!(!session.is_current(&ticket));
        let outcome = session.complete(ticket, Ok("late".to_string()));
        assert_eq!(outcome, CompletionOutcome::Discarded);
        assert_eq!(session.state(), &ExplanationState::default());
    }

    #[test]
    fn test_old_ticket_does_not_touch_new_request() {
        let mut session = ExplanationSession::default();
        let old = session.request(1).unwrap();
        session.dismiss();
        let new = session.request(1).unwrap();

        assert_eq!(session.complete(old, Ok("old".into())), CompletionOutcome::Discarded);
        assert_eq!(session.state().status, ExplanationStatus::Loading);

        assert_eq!(session.complete(new, Ok("new".into())), CompletionOutcome::Applied);
        assert_eq!(session.state().text.as_deref(), Some("new"));
    }

    #[test]
    fn test_selecting_other_paragraph_replaces_shown() {
        let mut session = ExplanationSession::default();
        let ticket = session.request(1).unwrap();
        session.complete(ticket, Ok("one".into()));

        let ticket = session.request(2).unwrap();
        assert_eq!(session.state().active_paragraph_id, Some(2));
        assert_eq!(session.state().text, None);
        session.complete(ticket, Ok("two".into()));
        assert_eq!(session.state().text.as_deref(), Some("two"));
    }

    #[test]
    fn test_completion_applies_once() {
        let mut session = ExplanationSession::default();
        let ticket = session.request(4).unwrap();

        assert!(session.complete(ticket, Ok("a".into())).is_applied());
        assert!(!session.complete(ticket, Err(ServiceError::EmptyResponse)).is_applied());
        assert_eq!(session.state().status, ExplanationStatus::Ready);
        assert_eq!(session.state().text.as_deref(), Some("a"));
    }

    #[test]
    fn test_custom_copy() {
        let mut session = ExplanationSession::new(ExplanationCopy {
            failure: "down".into(),
            empty: "nothing".into(),
        });
        let ticket = session.request(1).unwrap();
        session.complete(ticket, Err(ServiceError::Timeout(std::time::Duration::from_secs(1))));
        assert_eq!(session.state().text.as_deref(), Some("down"));
    }
}
