//! Shared harness for session flow tests
//!
//! `ScriptedGateway` forwards every remote call to the test as a [`Call`]
//! carrying a oneshot reply channel, so a test decides when (and whether)
//! each call resolves.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::sync::{mpsc, oneshot};

use companion_core::{
    AiGateway, AudioError, AudioPlayer, AudioSink, Companion, CompanionConfig, CompanionMessage,
    MemorySink, Passage, PcmBuffer, PromptPayload, QuizQuestion, ServiceError, Work,
};

/// A remote call waiting for the test to answer it
#[derive(Debug)]
pub enum Call {
    Text {
        payload: PromptPayload,
        reply: oneshot::Sender<Result<String, ServiceError>>,
    },
    Speech {
        text: String,
        reply: oneshot::Sender<Result<Option<Vec<u8>>, ServiceError>>,
    },
}

impl Call {
    pub fn answer_text(self, result: Result<String, ServiceError>) {
        match self {
            Self::Text { reply, .. } => {
                let _ = reply.send(result);
            }
            Self::Speech { .. } => panic!("expected a text call, got speech"),
        }
    }

    pub fn answer_speech(self, result: Result<Option<Vec<u8>>, ServiceError>) {
        match self {
            Self::Speech { reply, .. } => {
                let _ = reply.send(result);
            }
            Self::Text { .. } => panic!("expected a speech call, got text"),
        }
    }

    pub fn payload(&self) -> Option<&PromptPayload> {
        match self {
            Self::Text { payload, .. } => Some(payload),
            Self::Speech { .. } => None,
        }
    }
}

pub struct ScriptedGateway {
    calls: mpsc::UnboundedSender<Call>,
}

#[async_trait::async_trait]
impl AiGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn generate_text(&self, payload: &PromptPayload) -> Result<String, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.calls
            .send(Call::Text {
                payload: payload.clone(),
                reply,
            })
            .map_err(|_| ServiceError::Transport("harness gone".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(ServiceError::Transport("reply dropped".into())))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.calls
            .send(Call::Speech {
                text: text.to_string(),
                reply,
            })
            .map_err(|_| ServiceError::Transport("harness gone".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(ServiceError::Transport("reply dropped".into())))
    }
}

pub struct Harness {
    pub companion: Companion<ScriptedGateway>,
    pub calls: mpsc::UnboundedReceiver<Call>,
    pub sink: Arc<MemorySink>,
    pub messages: mpsc::Receiver<CompanionMessage>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CompanionConfig::default())
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let mut config = CompanionConfig::default();
        config.gateway.request_timeout = timeout;
        Self::with_config(config)
    }

    pub fn with_config(config: CompanionConfig) -> Self {
        let sink = Arc::new(MemorySink::new());
        Self::build(config, sink.clone(), sink)
    }

    /// Harness whose device blocks every handover until the gate opens
    ///
    /// The recorder holds each accepted buffer as playing until stopped.
    pub fn with_gate() -> (Self, Arc<GateSink>) {
        let recorder = Arc::new(MemorySink::new());
        recorder.hold(true);
        let gate = Arc::new(GateSink::new(recorder.clone()));
        let harness = Self::build(CompanionConfig::default(), recorder, gate.clone());
        (harness, gate)
    }

    fn build(config: CompanionConfig, sink: Arc<MemorySink>, device: Arc<dyn AudioSink>) -> Self {
        let (calls_tx, calls) = mpsc::unbounded_channel();
        let (tx, messages) = mpsc::channel(4096);
        let player = AudioPlayer::new(device);
        let companion = Companion::new(
            sample_work(),
            ScriptedGateway { calls: calls_tx },
            player,
            &config,
            tx,
        );
        Self {
            companion,
            calls,
            sink,
            messages,
        }
    }

    /// Wait for the next remote call issued by a spawned task
    pub async fn next_call(&mut self) -> Call {
        self.calls.recv().await.expect("gateway dropped")
    }

    /// Drain published messages
    pub fn drain_messages(&mut self) -> Vec<CompanionMessage> {
        let mut drained = Vec::new();
        while let Ok(msg) = self.messages.try_recv() {
            drained.push(msg);
        }
        drained
    }
}

/// Device whose `play` blocks until [`open`](GateSink::open) is called
pub struct GateSink {
    recorder: Arc<MemorySink>,
    open: Mutex<bool>,
    opened: Condvar,
    entered_tx: mpsc::UnboundedSender<()>,
    entered_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<()>>,
}

impl GateSink {
    pub fn new(recorder: Arc<MemorySink>) -> Self {
        let (entered_tx, entered_rx) = mpsc::unbounded_channel();
        Self {
            recorder,
            open: Mutex::new(false),
            opened: Condvar::new(),
            entered_tx,
            entered_rx: tokio::sync::Mutex::new(entered_rx),
        }
    }

    /// Wait until a handover is blocked inside the device
    pub async fn entered(&self) {
        self.entered_rx
            .lock()
            .await
            .recv()
            .await
            .expect("gate sink dropped");
    }

    /// Let every pending and future handover through
    pub fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }
}

impl AudioSink for GateSink {
    fn play(&self, buffer: PcmBuffer) -> Result<(), AudioError> {
        let _ = self.entered_tx.send(());
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
        drop(open);
        self.recorder.play(buffer)
    }

    fn is_playing(&self) -> bool {
        self.recorder.is_playing()
    }

    fn stop(&self) {
        self.recorder.stop();
    }
}

pub fn sample_work() -> Work {
    let passages = (1..=5)
        .map(|id| Passage {
            id,
            content: format!("第{id}段原文。"),
            translation: format!("第{id}段译文。"),
            annotations: Vec::new(),
        })
        .collect();
    let quiz = (0..5)
        .map(|i| QuizQuestion {
            prompt: format!("第{}题", i + 1),
            options: vec!["甲".into(), "乙".into(), "丙".into(), "丁".into()],
            correct_option: i % 4,
            explanation: format!("答案是第{}项。", i % 4 + 1),
        })
        .collect();
    Work {
        title: "滕王阁序".to_string(),
        author: "王勃".to_string(),
        passages,
        quiz,
    }
}

/// Little-endian PCM for the given samples
pub fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
