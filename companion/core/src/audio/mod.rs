//! Audio Codec & Player
//!
//! Turns a synthesized speech payload into normalized samples and drives
//! the single process-wide output device.
//!
//! ```text
//!  gateway bytes ──► codec::decode ──► PcmBuffer ──► AudioPlayer ──► AudioSink
//!                    (i16 LE mono)     (f32, 24 kHz)  (single-flight)  (rodio / memory)
//! ```

mod codec;
mod player;
#[cfg(feature = "rodio")]
mod rodio_sink;
mod sink;

pub use codec::{decode, PcmBuffer, CHANNELS, SAMPLE_RATE};
pub use player::AudioPlayer;
#[cfg(feature = "rodio")]
pub use rodio_sink::RodioSink;
pub use sink::{AudioSink, MemorySink};
