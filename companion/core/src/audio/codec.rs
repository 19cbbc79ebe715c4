//! PCM decoding for synthesized speech.

use std::time::Duration;

use crate::error::DecodeError;

/// Sample rate of synthesized speech, in Hz
pub const SAMPLE_RATE: u32 = 24_000;

/// Synthesized speech is mono
pub const CHANNELS: u16 = 1;

/// Normalized mono samples ready for playback
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Wrap already-normalized samples
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Samples in [-1.0, 1.0]
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_precision_loss)]
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Take the samples out of the buffer
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Decode little-endian signed 16-bit mono PCM at 24 kHz
///
/// Each sample is divided by 32768.0, so `i16::MIN` maps to exactly -1.0.
pub fn decode(payload: &[u8]) -> Result<PcmBuffer, DecodeError> {
    if payload.len() % 2 != 0 {
        return Err(DecodeError::OddLength { len: payload.len() });
    }

    let samples = payload
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(PcmBuffer::new(samples, SAMPLE_RATE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_extremes() {
        let buffer = decode(&[0x00, 0x80]).unwrap();
        assert_eq!(buffer.samples(), &[-1.0]);

        let buffer = decode(&[0xFF, 0x7F]).unwrap();
        assert!((buffer.samples()[0] - 0.999_969_5).abs() < 1e-6);

        let buffer = decode(&[0x00, 0x00]).unwrap();
        assert_eq!(buffer.samples(), &[0.0]);
    }

    #[test]
    fn test_decode_is_little_endian() {
        // 0x0100 = 256
        let buffer = decode(&[0x00, 0x01, 0x01, 0x00]).unwrap();
        assert_eq!(buffer.len(), 2);
        assert!((buffer.samples()[0] - 256.0 / 32768.0).abs() < f32::EPSILON);
        assert!((buffer.samples()[1] - 1.0 / 32768.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_decode_empty() {
        let buffer = decode(&[]).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.sample_rate(), SAMPLE_RATE);
        assert_eq!(buffer.duration(), Duration::ZERO);
    }

    #[test]
    fn test_decode_odd_length() {
        assert_eq!(decode(&[0x00]), Err(DecodeError::OddLength { len: 1 }));
        assert_eq!(
            decode(&[0x00, 0x00, 0x7F]),
            Err(DecodeError::OddLength { len: 3 })
        );
    }

    #[test]
    fn test_duration() {
        let buffer = decode(&vec![0u8; 48_000]).unwrap();
        assert_eq!(buffer.len(), 24_000);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }
}
