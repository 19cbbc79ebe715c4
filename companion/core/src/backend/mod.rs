//! AI Gateway
//!
//! Typed access to the two remote capabilities the engine needs: text
//! generation and speech synthesis. Prompt construction lives here so the
//! sessions only ever pass typed payloads.
//!
//! # Available Gateways
//!
//! - **Gemini**: Google generative language REST API (default)
//!
//! # Usage
//!
//! ```ignore
//! use companion_core::backend::{AiGateway, GeminiGateway, PromptBook, PromptPayload};
//!
//! let gateway = GeminiGateway::new(&config.gateway, PromptBook::new("滕王阁序"))?;
//! let text = gateway
//!     .generate_text(&PromptPayload::Explain { passage: "豫章故郡".into() })
//!     .await?;
//! ```
//!
//! Gateways never retry and never substitute fallback copy; failures are
//! returned as [`ServiceError`](crate::error::ServiceError) and the calling
//! session decides what the user sees.

mod gemini;
mod prompts;
mod traits;

pub use gemini::GeminiGateway;
pub use prompts::{PromptBook, TextRequest, EXPLAIN_TEMPERATURE, TUTOR_TEMPERATURE};
pub use traits::{AiGateway, PromptKind, PromptPayload};
