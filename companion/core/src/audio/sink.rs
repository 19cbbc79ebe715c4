//! `AudioSink` abstraction over the output device.
//!
//! The trait is object-safe and all methods take `&self`; implementations
//! use interior mutability. [`AudioPlayer`](super::AudioPlayer) holds one
//! sink for the whole process.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::codec::PcmBuffer;
use crate::error::AudioError;

/// Abstraction over an audio output device
pub trait AudioSink: Send + Sync {
    /// Schedule `buffer` for immediate playback
    ///
    /// Returns once the device has accepted the buffer, not when playback
    /// ends.
    fn play(&self, buffer: PcmBuffer) -> Result<(), AudioError>;

    /// Whether a previously scheduled buffer is still audible
    fn is_playing(&self) -> bool;

    /// Stop playback immediately
    fn stop(&self);
}

/// Sink that keeps accepted buffers in memory
///
/// Used when no output device is compiled in, and as a recorder in tests.
/// Playback is instantaneous unless [`hold`](Self::hold) is set, which makes
/// the sink report itself as playing until [`stop`](AudioSink::stop).
#[derive(Debug, Default)]
pub struct MemorySink {
    played: Mutex<Vec<PcmBuffer>>,
    hold: AtomicBool,
    playing: AtomicBool,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep reporting `is_playing` after each accepted buffer
    pub fn hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
        if !hold {
            self.playing.store(false, Ordering::SeqCst);
        }
    }

    /// Buffers accepted so far
    #[must_use]
    pub fn played(&self) -> Vec<PcmBuffer> {
        self.played.lock().clone()
    }

    /// Number of buffers accepted so far
    #[must_use]
    pub fn play_count(&self) -> usize {
        self.played.lock().len()
    }
}

impl AudioSink for MemorySink {
    fn play(&self, buffer: PcmBuffer) -> Result<(), AudioError> {
        tracing::info!(
            samples = buffer.len(),
            duration_ms = u64::try_from(buffer.duration().as_millis()).unwrap_or(u64::MAX),
            "Accepted narration buffer"
        );
        self.playing
            .store(self.hold.load(Ordering::SeqCst), Ordering::SeqCst);
        self.played.lock().push(buffer);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }
}
