//! Companion - Learning Session Orchestrator
//!
//! The Companion owns the four sessions, the AI gateway and the audio
//! player. Surfaces send [`StudyEvent`]s in and receive
//! [`CompanionMessage`] snapshots out.
//!
//! Remote calls run as spawned tasks. Each task reports back on an internal
//! channel together with the ticket it was started with; the completion is
//! applied only if the owning session still considers that ticket current.
//! Nothing is ever cancelled mid-flight: superseded work finishes and is
//! dropped.
//!
//! ```text
//!  StudyEvent ──► handle_event ──► session.request() ──► tokio::spawn(gateway call)
//!                                                              │
//!  CompanionMessage ◄── publish ◄── session.complete() ◄── completion channel
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{self, AudioPlayer, PcmBuffer};
use crate::backend::{AiGateway, PromptPayload};
use crate::chat::{ChatCopy, ChatTicket, TutorChat};
use crate::config::CompanionConfig;
use crate::content::Work;
use crate::error::{AudioError, NarrationError, ServiceError};
use crate::events::{Section, StudyEvent};
use crate::explanation::{ExplanationCopy, ExplanationSession, ExplanationState, ExplanationTicket};
use crate::messages::{CompanionMessage, NotifyLevel};
use crate::outcome::{CompletionOutcome, Outcome, StateConflict};
use crate::quiz::{QuizEngine, QuizState};
use crate::speech::{SpeechSession, SpeechState, SpeechTicket};

/// Result of an asynchronous step, tagged with the ticket that started it
#[derive(Debug)]
enum Completion {
    Explanation {
        ticket: ExplanationTicket,
        result: Result<String, ServiceError>,
    },
    Chat {
        ticket: ChatTicket,
        result: Result<String, ServiceError>,
    },
    Synthesized {
        ticket: SpeechTicket,
        result: Result<Option<PcmBuffer>, NarrationError>,
    },
    Played {
        ticket: SpeechTicket,
        result: Result<(), AudioError>,
    },
}

/// In-flight task handles, one slot per kind
#[derive(Debug, Default)]
struct Inflight {
    explanation: Option<JoinHandle<()>>,
    chat: Option<JoinHandle<()>>,
    speech: Option<JoinHandle<()>>,
}

impl Inflight {
    fn replace(slot: &mut Option<JoinHandle<()>>, handle: JoinHandle<()>) {
        if let Some(previous) = slot.replace(handle) {
            if !previous.is_finished() {
                tracing::debug!("Superseded task still running; its result will be discarded");
            }
        }
    }

    fn abort_all(&mut self) {
        for handle in [
            self.explanation.take(),
            self.chat.take(),
            self.speech.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

/// Bound a gateway call by `deadline`
async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(ServiceError::Timeout(deadline)))
}

/// The Companion - orchestrates one study session
pub struct Companion<G: AiGateway> {
    /// Content being studied
    work: Work,
    /// Remote generative service
    gateway: Arc<G>,
    /// Single-flight output device
    player: AudioPlayer,
    explanation: ExplanationSession,
    speech: SpeechSession,
    chat: TutorChat,
    quiz: QuizEngine,
    /// View the surface currently shows
    section: Section,
    /// Deadline for every remote call
    request_timeout: Duration,
    inflight: Inflight,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    /// Channel to the surface
    tx: mpsc::Sender<CompanionMessage>,
}

impl<G: AiGateway + 'static> Companion<G> {
    /// Create a Companion for `work`
    pub fn new(
        work: Work,
        gateway: G,
        player: AudioPlayer,
        config: &CompanionConfig,
        tx: mpsc::Sender<CompanionMessage>,
    ) -> Self {
        let chat_copy = ChatCopy {
            greeting: config.greeting.clone(),
            reset_greeting: config.reset_greeting.clone(),
            ..ChatCopy::default()
        };
        let chat = TutorChat::new(work.full_text(), chat_copy);
        let quiz = QuizEngine::new(work.quiz.clone());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            work,
            gateway: Arc::new(gateway),
            player,
            explanation: ExplanationSession::new(ExplanationCopy::default()),
            speech: SpeechSession::new(),
            chat,
            quiz,
            section: Section::default(),
            request_timeout: config.gateway.request_timeout,
            inflight: Inflight::default(),
            completions_tx,
            completions_rx,
            tx,
        }
    }

    /// Content being studied
    pub fn work(&self) -> &Work {
        &self.work
    }

    /// Current explanation state
    pub fn explanation(&self) -> &ExplanationState {
        self.explanation.state()
    }

    /// Current narration state
    pub fn speech(&self) -> SpeechState {
        self.speech.state()
    }

    /// Tutor conversation
    pub fn chat(&self) -> &TutorChat {
        &self.chat
    }

    /// Quiz progress
    pub fn quiz(&self) -> &QuizState {
        self.quiz.state()
    }

    /// View the surface currently shows
    pub fn section(&self) -> Section {
        self.section
    }

    /// Check the service and publish the initial state
    pub async fn start(&mut self) {
        if !self.gateway.health_check().await {
            self.notify(
                NotifyLevel::Warning,
                &format!(
                    "{} service not reachable - explanations and narration may fail",
                    self.gateway.name()
                ),
            )
            .await;
        }

        tracing::info!(
            title = %self.work.title,
            passages = self.work.passages.len(),
            questions = self.work.quiz.len(),
            gateway = self.gateway.name(),
            "Companion started"
        );

        self.publish_explanation().await;
        self.publish_speech().await;
        self.publish_chat().await;
        self.publish_quiz().await;
    }

    /// Handle an event from the surface
    ///
    /// Rejected actions return the [`StateConflict`] and leave every session
    /// unchanged.
    pub async fn handle_event(&mut self, event: StudyEvent) -> Outcome {
        tracing::debug!(?event, "Handling study event");

        let outcome = match event {
            StudyEvent::Explain { paragraph_id } => self.request_explanation(paragraph_id).await,
            StudyEvent::DismissExplanation => {
                self.explanation.dismiss();
                self.publish_explanation().await;
                Ok(())
            }
            StudyEvent::Speak { paragraph_id } => self.request_speech(paragraph_id).await,
            StudyEvent::StopSpeech => {
                self.stop_speech().await;
                Ok(())
            }
            StudyEvent::SendChat { text } => self.send_chat(&text).await,
            StudyEvent::ResetChat => {
                self.chat.reset();
                self.publish_chat().await;
                Ok(())
            }
            StudyEvent::SelectOption { index } => {
                let result = self.quiz.select_option(index).map(|_| ());
                if result.is_ok() {
                    self.publish_quiz().await;
                }
                result
            }
            StudyEvent::NextQuestion => {
                let result = self.quiz.next();
                if result.is_ok() {
                    self.publish_quiz().await;
                }
                result
            }
            StudyEvent::ResetQuiz => {
                self.quiz.reset();
                self.publish_quiz().await;
                Ok(())
            }
            StudyEvent::Navigate { section } => {
                self.navigate(section).await;
                Ok(())
            }
            StudyEvent::Quit => {
                self.shutdown().await;
                Ok(())
            }
        };

        if let Err(conflict) = outcome {
            tracing::debug!(%conflict, "Study event ignored");
        }
        outcome
    }

    async fn request_explanation(&mut self, paragraph_id: u32) -> Outcome {
        let passage = self
            .work
            .passage(paragraph_id)
            .ok_or(StateConflict::UnknownParagraph)?
            .content
            .clone();
        let ticket = self.explanation.request(paragraph_id)?;
        self.publish_explanation().await;

        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions_tx.clone();
        let deadline = self.request_timeout;
        let handle = tokio::spawn(async move {
            let payload = PromptPayload::Explain { passage };
            let result = with_deadline(deadline, gateway.generate_text(&payload)).await;
            let _ = completions.send(Completion::Explanation { ticket, result });
        });
        Inflight::replace(&mut self.inflight.explanation, handle);
        Ok(())
    }

    async fn send_chat(&mut self, text: &str) -> Outcome {
        let ticket = self.chat.send(text)?;
        self.publish_chat().await;

        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions_tx.clone();
        let deadline = self.request_timeout;
        let handle = tokio::spawn(async move {
            let result = with_deadline(deadline, gateway.generate_text(ticket.payload())).await;
            let _ = completions.send(Completion::Chat { ticket, result });
        });
        Inflight::replace(&mut self.inflight.chat, handle);
        Ok(())
    }

    async fn request_speech(&mut self, paragraph_id: u32) -> Outcome {
        let text = self
            .work
            .passage(paragraph_id)
            .ok_or(StateConflict::UnknownParagraph)?
            .content
            .clone();
        let ticket = self.speech.request(paragraph_id, self.player.is_busy())?;
        self.publish_speech().await;

        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions_tx.clone();
        let deadline = self.request_timeout;
        let handle = tokio::spawn(async move {
            let result = match with_deadline(deadline, gateway.synthesize_speech(&text)).await {
                Ok(Some(bytes)) => audio::decode(&bytes).map(Some).map_err(NarrationError::from),
                Ok(None) => Ok(None),
                Err(error) => Err(NarrationError::from(error)),
            };
            let _ = completions.send(Completion::Synthesized { ticket, result });
        });
        Inflight::replace(&mut self.inflight.speech, handle);
        Ok(())
    }

    async fn stop_speech(&mut self) {
        if let Some(paragraph_id) = self.speech.stop() {
            tracing::debug!(paragraph_id, "Narration stopped");
        }
        self.player.stop();
        self.publish_speech().await;
    }

    async fn navigate(&mut self, section: Section) {
        tracing::debug!(from = ?self.section, to = ?section, "Navigating");
        self.section = section;
        self.explanation.dismiss();
        self.publish_explanation().await;
        self.stop_speech().await;
    }

    /// Apply every completion that has already arrived
    ///
    /// Returns how many completions were processed.
    pub async fn poll_completions(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion).await;
            processed += 1;
        }
        processed
    }

    /// Wait for the next completion and apply it
    pub async fn next_completion(&mut self) -> Option<CompletionOutcome> {
        let completion = self.completions_rx.recv().await?;
        Some(self.apply(completion).await)
    }

    async fn apply(&mut self, completion: Completion) -> CompletionOutcome {
        match completion {
            Completion::Explanation { ticket, result } => {
                let outcome = self.explanation.complete(ticket, result);
                if outcome.is_applied() {
                    self.publish_explanation().await;
                }
                outcome
            }
            Completion::Chat { ticket, result } => {
                let outcome = self.chat.complete(&ticket, result);
                if outcome.is_applied() {
                    self.publish_chat().await;
                }
                outcome
            }
            Completion::Synthesized { ticket, result } => {
                if !self.speech.is_current(&ticket) {
                    tracing::debug!(
                        paragraph_id = ticket.paragraph_id(),
                        "Discarding stale synthesis"
                    );
                    return CompletionOutcome::Discarded;
                }
                match result {
                    Ok(Some(buffer)) if !buffer.is_empty() => {
                        self.play(ticket, buffer);
                        CompletionOutcome::Applied
                    }
                    Ok(_) => {
                        tracing::info!(
                            paragraph_id = ticket.paragraph_id(),
                            "Synthesis returned no audio"
                        );
                        self.release_speech(ticket).await
                    }
                    Err(error) => {
                        tracing::warn!(
                            paragraph_id = ticket.paragraph_id(),
                            %error,
                            "Narration failed"
                        );
                        self.release_speech(ticket).await
                    }
                }
            }
            Completion::Played { ticket, result } => {
                match result {
                    Ok(()) => {}
                    Err(AudioError::Stopped) => {
                        tracing::debug!(
                            paragraph_id = ticket.paragraph_id(),
                            "Narration stopped during handover"
                        );
                    }
                    Err(error) => {
                        tracing::warn!(
                            paragraph_id = ticket.paragraph_id(),
                            %error,
                            "Playback failed"
                        );
                    }
                }
                self.release_speech(ticket).await
            }
        }
    }

    fn play(&mut self, ticket: SpeechTicket, buffer: PcmBuffer) {
        tracing::debug!(
            paragraph_id = ticket.paragraph_id(),
            samples = buffer.len(),
            "Scheduling narration"
        );
        let playback = self.player.play(buffer);
        let completions = self.completions_tx.clone();
        let handle = tokio::spawn(async move {
            let result = playback.await;
            let _ = completions.send(Completion::Played { ticket, result });
        });
        Inflight::replace(&mut self.inflight.speech, handle);
    }

    async fn release_speech(&mut self, ticket: SpeechTicket) -> CompletionOutcome {
        let outcome = self.speech.finish(ticket);
        if outcome.is_applied() {
            self.publish_speech().await;
        }
        outcome
    }

    /// Drive the companion until the surface quits or disconnects
    pub async fn run(&mut self, mut events: mpsc::Receiver<StudyEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(StudyEvent::Quit) | None => {
                        self.shutdown().await;
                        break;
                    }
                    Some(event) => {
                        let _ = self.handle_event(event).await;
                    }
                },
                Some(completion) = self.completions_rx.recv() => {
                    self.apply(completion).await;
                }
            }
        }
    }

    /// Stop narration, drop in-flight work and tell the surface to quit
    pub async fn shutdown(&mut self) {
        self.inflight.abort_all();
        self.speech.stop();
        self.player.stop();
        tracing::info!("Companion shutting down");
        self.send(CompanionMessage::Quit {
            message: Some("再会！".to_string()),
        })
        .await;
    }

    async fn publish_explanation(&self) {
        self.send(CompanionMessage::Explanation(self.explanation.state().clone()))
            .await;
    }

    async fn publish_speech(&self) {
        self.send(CompanionMessage::Speech(self.speech.state())).await;
    }

    async fn publish_chat(&self) {
        self.send(CompanionMessage::Chat {
            messages: self.chat.messages().to_vec(),
            status: self.chat.status(),
        })
        .await;
    }

    async fn publish_quiz(&self) {
        self.send(CompanionMessage::Quiz(self.quiz.state().clone()))
            .await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.send(CompanionMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the surface
    async fn send(&self, msg: CompanionMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}
