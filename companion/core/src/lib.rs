//! Companion Core - Interactive Learning Session Engine
//!
//! This crate holds the stateful, concurrency-sensitive part of the study
//! companion: on-demand AI explanations of passages, a tutor conversation
//! grounded in the full text, narration through a single audio device, and
//! a scored quiz. It is independent of any UI; the bundled CLI is one
//! surface among possible others.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Surfaces (CLI, ...)                      │
//! │                 StudyEvent (up)   CompanionMessage (down)        │
//! └────────────────────────────────┬─────────────────────────────────┘
//!                                  │
//! ┌────────────────────────────────┼─────────────────────────────────┐
//! │                         COMPANION CORE                           │
//! │  ┌─────────────────────────────┴──────────────────────────────┐  │
//! │  │                        Companion                           │  │
//! │  │  ┌─────────────┐ ┌──────────┐ ┌───────────┐ ┌──────────┐   │  │
//! │  │  │ Explanation │ │  Speech  │ │ TutorChat │ │   Quiz   │   │  │
//! │  │  │   Session   │ │ Session  │ │           │ │  Engine  │   │  │
//! │  │  └──────┬──────┘ └────┬─────┘ └─────┬─────┘ └──────────┘   │  │
//! │  └─────────┼─────────────┼─────────────┼──────────────────────┘  │
//! │            │        ┌────┴─────┐       │                         │
//! │            │        │  Audio   │       │                         │
//! │            │        │  Player  │       │                         │
//! │            │        └────┬─────┘       │                         │
//! │  ┌─────────┴─────────────┴─────────────┴──────────────────────┐  │
//! │  │                 AI Gateway (Gemini REST)                   │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Companion`]: Orchestrates the sessions and the remote calls
//! - [`StudyEvent`]: Events sent from a surface to the engine
//! - [`CompanionMessage`]: State snapshots sent to the surface
//! - [`AiGateway`]: Text generation and speech synthesis
//! - [`AudioPlayer`]: Single-flight playback over an [`AudioSink`]
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use companion_core::{
//!     load_config, load_work, AudioPlayer, Companion, GeminiGateway, MemorySink, PromptBook,
//! };
//! use tokio::sync::mpsc;
//!
//! let config = load_config()?;
//! let work = load_work("demos/tengwangge.toml".as_ref())?;
//! let prompts = PromptBook::new(&work.title)
//!     .with_temperatures(config.explain_temperature, config.tutor_temperature);
//! let gateway = GeminiGateway::new(&config.gateway, prompts)?;
//! let player = AudioPlayer::new(Arc::new(MemorySink::new()));
//!
//! let (tx, mut rx) = mpsc::channel(100);
//! let mut companion = Companion::new(work, gateway, player, &config, tx);
//! companion.start().await;
//! ```
//!
//! # Staleness
//!
//! Remote calls are never cancelled. Each session issues a ticket per
//! request and bumps its generation on dismissal, reset or navigation; a
//! completion whose ticket is no longer current is dropped. See
//! [`outcome`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod audio;
pub mod backend;
pub mod chat;
pub mod companion;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod explanation;
pub mod messages;
pub mod outcome;
pub mod quiz;
pub mod speech;

// Re-exports for convenience
pub use audio::{decode, AudioPlayer, AudioSink, MemorySink, PcmBuffer, CHANNELS, SAMPLE_RATE};
#[cfg(feature = "rodio")]
pub use audio::RodioSink;
pub use backend::{AiGateway, GeminiGateway, PromptBook, PromptKind, PromptPayload, TextRequest};
pub use chat::{ChatCopy, ChatMessage, ChatStatus, ChatTicket, MessageRole, TutorChat};
pub use companion::Companion;
pub use content::{load_work, Annotation, ContentError, Passage, QuizQuestion, Work};
pub use error::{AudioError, DecodeError, NarrationError, ServiceError};
pub use events::{Section, StudyEvent};
pub use explanation::{
    ExplanationCopy, ExplanationSession, ExplanationState, ExplanationStatus, ExplanationTicket,
};
pub use messages::{CompanionMessage, NotifyLevel};
pub use outcome::{CompletionOutcome, Generation, Outcome, StateConflict};
pub use quiz::{OptionVerdict, QuizEngine, QuizState};
pub use speech::{SpeechSession, SpeechState, SpeechTicket};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env,
    CompanionConfig, CompanionToml, ConfigError, ConfigOverrides, ConfigSource, GatewayConfig,
};
