//! Single-flight playback over the process-wide output device.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::codec::PcmBuffer;
use super::sink::AudioSink;
use crate::error::AudioError;

/// Drives the output device, one buffer at a time
///
/// Refuses to schedule a buffer while the previous one is still audible;
/// nothing is queued.
///
/// Every [`stop`](Self::stop) starts a new playback epoch. A handover
/// scheduled under an earlier epoch never stays audible: it is skipped if
/// the stop came first, and silenced right after the device accepts it if
/// the stop raced with the handover.
#[derive(Clone)]
pub struct AudioPlayer {
    sink: Arc<dyn AudioSink>,
    epoch: Arc<AtomicU64>,
    /// Held for the whole handover so a superseded buffer is silenced
    /// before the next one reaches the device
    handover: Arc<Mutex<()>>,
}

impl AudioPlayer {
    /// Create a player over `sink`
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            epoch: Arc::new(AtomicU64::new(0)),
            handover: Arc::new(Mutex::new(())),
        }
    }

    /// Whether a previous buffer is still playing
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.sink.is_playing()
    }

    /// Schedule `buffer` for immediate playback
    ///
    /// The playback epoch is captured when this is called, not when the
    /// returned future is first polled. The future resolves once the device
    /// accepted the buffer; an empty buffer is a no-op that completes
    /// immediately. A [`stop`](Self::stop) issued before the device accepts
    /// the buffer makes it resolve to [`AudioError::Stopped`].
    pub fn play(
        &self,
        buffer: PcmBuffer,
    ) -> impl Future<Output = Result<(), AudioError>> + Send + 'static {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let player = self.clone();

        async move {
            if buffer.is_empty() {
                tracing::debug!("Skipping playback of empty buffer");
                return Ok(());
            }

            tokio::task::spawn_blocking(move || player.hand_over(epoch, buffer))
                .await
                .map_err(|_| AudioError::ThreadDied)?
        }
    }

    fn hand_over(&self, epoch: u64, buffer: PcmBuffer) -> Result<(), AudioError> {
        let _handover = self.handover.lock();

        if self.is_superseded(epoch) {
            tracing::debug!("Playback stopped before handover");
            return Err(AudioError::Stopped);
        }
        if self.sink.is_playing() {
            return Err(AudioError::Busy);
        }

        self.sink.play(buffer)?;

        if self.is_superseded(epoch) {
            tracing::debug!("Playback stopped during handover; silencing");
            self.sink.stop();
            return Err(AudioError::Stopped);
        }
        Ok(())
    }

    fn is_superseded(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    /// Stop whatever is playing and supersede pending handovers
    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.sink.stop();
    }
}

impl std::fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPlayer")
            .field("busy", &self.is_busy())
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MemorySink;

    #[tokio::test]
    async fn test_play_schedules_buffer() {
        let sink = Arc::new(MemorySink::new());
        let player = AudioPlayer::new(sink.clone());

        player
            .play(PcmBuffer::new(vec![0.1, 0.2], 24_000))
            .await
            .unwrap();
        assert_eq!(sink.play_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_buffer_is_noop() {
        let sink = Arc::new(MemorySink::new());
        let player = AudioPlayer::new(sink.clone());

        player.play(PcmBuffer::default()).await.unwrap();
        assert_eq!(sink.play_count(), 0);
    }

    #[tokio::test]
    async fn test_busy_device_rejects() {
        let sink = Arc::new(MemorySink::new());
        sink.hold(true);
        let player = AudioPlayer::new(sink.clone());

        player
            .play(PcmBuffer::new(vec![0.1], 24_000))
            .await
            .unwrap();
        assert!(player.is_busy());

        let second = player.play(PcmBuffer::new(vec![0.2], 24_000)).await;
        assert_eq!(second, Err(AudioError::Busy));
        assert_eq!(sink.play_count(), 1);

        player.stop();
        assert!(!player.is_busy());
    }

    #[tokio::test]
    async fn test_stop_before_handover_skips_buffer() {
        let sink = Arc::new(MemorySink::new());
        let player = AudioPlayer::new(sink.clone());

        let pending = player.play(PcmBuffer::new(vec![0.1], 24_000));
        player.stop();

        assert_eq!(pending.await, Err(AudioError::Stopped));
        assert_eq!(sink.play_count(), 0);

        // a buffer scheduled after the stop plays normally
        player
            .play(PcmBuffer::new(vec![0.2], 24_000))
            .await
            .unwrap();
        assert_eq!(sink.play_count(), 1);
    }
}
