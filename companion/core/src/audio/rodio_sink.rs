//! Output device backed by rodio.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so the stream lives
//! on a dedicated thread and [`RodioSink`] forwards playback requests to it
//! over a channel. The `rodio::Sink` of the buffer being played is shared
//! with the proxy, so `is_playing` and `stop` never wait on the thread.

use std::sync::{mpsc, Arc};
use std::thread;

use parking_lot::Mutex;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

use super::codec::{PcmBuffer, CHANNELS};
use super::sink::AudioSink;
use crate::error::AudioError;

enum SinkCommand {
    Play {
        buffer: PcmBuffer,
        reply: mpsc::Sender<Result<(), AudioError>>,
    },
    Shutdown,
}

/// Sink of the buffer handed over last, if any
type CurrentSink = Arc<Mutex<Option<Sink>>>;

/// Handle to the audio output thread
pub struct RodioSink {
    cmd_tx: mpsc::Sender<SinkCommand>,
    current: CurrentSink,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioSink {
    /// Open the default output device on a dedicated thread
    pub fn spawn() -> Result<Self, AudioError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<SinkCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), AudioError>>();
        let current = CurrentSink::default();

        let thread_current = Arc::clone(&current);
        let thread = thread::Builder::new()
            .name("companion-audio".into())
            .spawn(move || Self::run(cmd_rx, init_tx, thread_current))
            .map_err(|e| AudioError::OutputUnavailable(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| AudioError::ThreadDied)??;

        Ok(Self {
            cmd_tx,
            current,
            thread: Some(thread),
        })
    }

    fn run(
        cmd_rx: mpsc::Receiver<SinkCommand>,
        init_tx: mpsc::Sender<Result<(), AudioError>>,
        current: CurrentSink,
    ) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(pair) => {
                let _ = init_tx.send(Ok(()));
                pair
            }
            Err(e) => {
                let _ = init_tx.send(Err(AudioError::OutputUnavailable(e.to_string())));
                return;
            }
        };

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                SinkCommand::Play { buffer, reply } => {
                    let mut slot = current.lock();
                    if let Some(old) = slot.take() {
                        old.stop();
                    }
                    let result = Sink::try_new(&handle)
                        .map(|sink| {
                            let rate = buffer.sample_rate();
                            sink.append(SamplesBuffer::new(CHANNELS, rate, buffer.into_samples()));
                            *slot = Some(sink);
                        })
                        .map_err(|e| AudioError::OutputUnavailable(e.to_string()));
                    drop(slot);
                    let _ = reply.send(result);
                }
                SinkCommand::Shutdown => break,
            }
        }

        if let Some(sink) = current.lock().take() {
            sink.stop();
        }
        tracing::debug!("Audio thread exiting");
    }
}

impl AudioSink for RodioSink {
    fn play(&self, buffer: PcmBuffer) -> Result<(), AudioError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(SinkCommand::Play { buffer, reply: tx })
            .map_err(|_| AudioError::ThreadDied)?;
        rx.recv().map_err(|_| AudioError::ThreadDied)?
    }

    fn is_playing(&self) -> bool {
        self.current.lock().as_ref().is_some_and(|sink| !sink.empty())
    }

    fn stop(&self) {
        if let Some(sink) = self.current.lock().take() {
            sink.stop();
        }
    }
}

impl Drop for RodioSink {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SinkCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
