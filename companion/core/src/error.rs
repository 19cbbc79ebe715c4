//! Error types for the learning session engine.
//!
//! Rejected actions (an occupied single-flight slot, a question that was
//! already answered) are not errors; they are reported as
//! [`StateConflict`](crate::outcome::StateConflict) values.

use std::time::Duration;

/// Failures talking to the generative AI service.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request never produced an HTTP response (network, TLS, DNS).
    #[error("Request to AI service failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("AI service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Malformed AI service response: {0}")]
    Malformed(String),

    /// The response was well formed but carried no text.
    #[error("AI service response contained no text")]
    EmptyResponse,

    /// No answer arrived before the configured request timeout.
    #[error("AI service did not answer within {0:?}")]
    Timeout(Duration),

    /// No API key was configured for the service.
    #[error("No API key configured for the AI service")]
    MissingApiKey,
}

/// Failures decoding a synthesized speech payload.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 16-bit PCM needs an even number of bytes.
    #[error("PCM payload has odd length {len}")]
    OddLength {
        /// Payload length in bytes
        len: usize,
    },
}

/// Failures driving the audio output device.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The output device could not be opened or refused the buffer.
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// A previous buffer is still playing.
    #[error("Audio output is still playing a previous buffer")]
    Busy,

    /// The audio thread is gone.
    #[error("Audio thread died")]
    ThreadDied,

    /// Playback was stopped while the buffer was being handed to the device.
    #[error("Playback stopped before the buffer was handed over")]
    Stopped,
}

/// Why a narration ended without sound.
///
/// Logged at the speech boundary; never shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NarrationError {
    /// Synthesis failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The synthesized payload was not valid PCM.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The output device refused the buffer.
    #[error(transparent)]
    Audio(#[from] AudioError),
}
