//! Gemini Gateway Implementation
//!
//! Gateway for Google's generative language REST API.
//!
//! # Gemini API
//!
//! - `POST /models/{model}:generateContent` - text generation and, with an
//!   `AUDIO` response modality, speech synthesis
//! - `GET /models` - list models (used as a health check)
//!
//! Authentication uses the `x-goog-api-key` header.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use super::prompts::{PromptBook, TextRequest};
use super::traits::{AiGateway, PromptPayload};
use crate::config::GatewayConfig;
use crate::error::ServiceError;

/// Gemini gateway client
#[derive(Clone)]
pub struct GeminiGateway {
    /// API base URL, without trailing slash
    base_url: String,
    /// Model used for explanations and tutoring
    text_model: String,
    /// Model used for narration
    speech_model: String,
    /// Prebuilt voice name
    voice: String,
    /// API key
    api_key: String,
    /// Prompt templates
    prompts: PromptBook,
    /// HTTP client
    http_client: reqwest::Client,
}

impl GeminiGateway {
    /// Create a gateway from configuration
    ///
    /// Fails with [`ServiceError::MissingApiKey`] when no key is configured.
    pub fn new(config: &GatewayConfig, prompts: PromptBook) -> Result<Self, ServiceError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ServiceError::MissingApiKey)?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            speech_model: config.speech_model.clone(),
            voice: config.voice.clone(),
            api_key,
            prompts,
            http_client,
        })
    }

    /// Get the generateContent endpoint URL for `model`
    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Get the model listing endpoint URL
    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    /// POST a generateContent body and return the parsed JSON response
    async fn post(&self, model: &str, body: &Value) -> Result<Value, ServiceError> {
        let response = self
            .http_client
            .post(self.generate_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}

/// Build the JSON body for a text generation request
fn text_body(request: &TextRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }],
        }],
        "systemInstruction": {
            "parts": [{ "text": request.system_instruction }],
        },
        "generationConfig": {
            "temperature": request.temperature,
        },
    })
}

/// Build the JSON body for a speech synthesis request
fn speech_body(narration: &str, voice: &str) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": narration }],
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice },
                },
            },
        },
    })
}

/// Concatenate the text parts of the first candidate
fn extract_text(data: &Value) -> Result<String, ServiceError> {
    let parts = data
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array);

    let text: String = parts
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(text)
}

/// Decode the inline audio of the first candidate, if any
fn extract_audio(data: &Value) -> Result<Option<Vec<u8>>, ServiceError> {
    let Some(encoded) = data
        .pointer("/candidates/0/content/parts/0/inlineData/data")
        .and_then(Value::as_str)
    else {
        return Ok(None);
    };

    if encoded.is_empty() {
        return Ok(None);
    }

    BASE64
        .decode(encoded)
        .map(Some)
        .map_err(|e| ServiceError::Malformed(format!("audio payload is not base64: {e}")))
}

#[async_trait]
impl AiGateway for GeminiGateway {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.models_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|response| response.status().is_success())
    }

    async fn generate_text(&self, payload: &PromptPayload) -> Result<String, ServiceError> {
        let request = self.prompts.text_request(payload);
        tracing::debug!(
            kind = ?request.kind,
            model = %self.text_model,
            temperature = request.temperature,
            "Sending text generation request"
        );

        let data = self.post(&self.text_model, &text_body(&request)).await?;
        extract_text(&data)
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        let narration = self.prompts.narration(text);
        tracing::debug!(
            model = %self.speech_model,
            voice = %self.voice,
            "Sending speech synthesis request"
        );

        let data = self
            .post(&self.speech_model, &speech_body(&narration, &self.voice))
            .await?;
        let audio = extract_audio(&data)?;

        if audio.is_none() {
            tracing::info!("Speech response carried no audio");
        }
        Ok(audio)
    }
}
