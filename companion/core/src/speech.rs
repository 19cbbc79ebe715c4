//! Speech session: the single narration slot.
//!
//! A paragraph occupies the slot from the moment synthesis is requested
//! until its audio was handed to the device, or until synthesis, decoding
//! or playback failed. Requests while the slot is taken are rejected, never
//! queued.

use serde::{Deserialize, Serialize};

use crate::outcome::{CompletionOutcome, Generation, Outcome, StateConflict};

/// Observable narration state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechState {
    /// Paragraph currently being synthesized or handed to the device
    pub speaking_paragraph_id: Option<u32>,
}

/// Identity of one narration request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeechTicket {
    paragraph_id: u32,
    generation: Generation,
}

impl SpeechTicket {
    /// Paragraph being narrated
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

/// Owns [`SpeechState`]
#[derive(Debug, Default)]
pub struct SpeechSession {
    state: SpeechState,
    generation: Generation,
}

impl SpeechSession {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current observable state
    #[must_use]
    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// Claim the narration slot for `paragraph_id`
    ///
    /// `device_busy` reports whether the output device still plays an
    /// earlier buffer.
    pub fn request(&mut self, paragraph_id: u32, device_busy: bool) -> Outcome<SpeechTicket> {
        if self.state.speaking_paragraph_id.is_some() {
            return Err(StateConflict::SpeechInFlight);
        }
        if device_busy {
            return Err(StateConflict::AudioBusy);
        }

        let generation = self.generation.bump();
        self.state.speaking_paragraph_id = Some(paragraph_id);
        tracing::debug!(paragraph_id, %generation, "Speech slot claimed");

        Ok(SpeechTicket {
            paragraph_id,
            generation,
        })
    }

    /// Whether `ticket` still owns the slot
    #[must_use]
    pub fn is_current(&self, ticket: &SpeechTicket) -> bool {
        ticket.generation == self.generation
            && self.state.speaking_paragraph_id == Some(ticket.paragraph_id)
    }

    /// Release the slot held by `ticket`
    pub fn finish(&mut self, ticket: SpeechTicket) -> CompletionOutcome {
        if !self.is_current(&ticket) {
            tracing::debug!(
                paragraph_id = ticket.paragraph_id,
                generation = %ticket.generation,
                "Discarding stale speech completion"
            );
            return CompletionOutcome::Discarded;
        }
        self.state.speaking_paragraph_id = None;
        CompletionOutcome::Applied
    }

    /// Release the slot and supersede any pending request
    ///
    /// Returns the paragraph that was being narrated.
    pub fn stop(&mut self) -> Option<u32> {
        self.generation.bump();
        self.state.speaking_paragraph_id.take()
    }
}
