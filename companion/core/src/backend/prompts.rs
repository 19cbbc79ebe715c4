//! Prompt templates
//!
//! Fixed system guidance per prompt kind, filled with the title of the work
//! and the caller's variable content.

use super::traits::{PromptKind, PromptPayload};

/// Default sampling temperature for explanations
pub const EXPLAIN_TEMPERATURE: f32 = 0.7;

/// Default sampling temperature for tutoring
pub const TUTOR_TEMPERATURE: f32 = 0.8;

/// A fully assembled text generation request
#[derive(Clone, Debug, PartialEq)]
pub struct TextRequest {
    /// Template that produced this request
    pub kind: PromptKind,
    /// Role instruction sent as the system instruction
    pub system_instruction: String,
    /// The assembled user prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
}

/// Builds prompts for one work
#[derive(Clone, Debug)]
pub struct PromptBook {
    title: String,
    explain_temperature: f32,
    tutor_temperature: f32,
}

impl PromptBook {
    /// Create a prompt book for the work called `title`
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            explain_temperature: EXPLAIN_TEMPERATURE,
            tutor_temperature: TUTOR_TEMPERATURE,
        }
    }

    /// Override the sampling temperatures
    #[must_use]
    pub fn with_temperatures(mut self, explain: f32, tutor: f32) -> Self {
        self.explain_temperature = explain;
        self.tutor_temperature = tutor;
        self
    }

    /// Title of the work
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Assemble the request for `payload`
    #[must_use]
    pub fn text_request(&self, payload: &PromptPayload) -> TextRequest {
        let title = &self.title;
        match payload {
            PromptPayload::Explain { passage } => TextRequest {
                kind: PromptKind::Explain,
                system_instruction:
                    "你是一个专业的语文老师，语气温和、博学，能用现代学生易懂的语言解释艰深的古文。"
                        .to_string(),
                prompt: format!(
                    "你是一名资深的中国古典文学教授。请深入浅出地解释《{title}》中的以下句子，\
                     包括字词含义、修辞手法、文学意境和背后的历史文化典故：\n\n\"{passage}\""
                ),
                temperature: self.explain_temperature,
            },
            PromptPayload::TutorAnswer { question, context } => TextRequest {
                kind: PromptKind::TutorAnswer,
                system_instruction: format!(
                    "你是一个专注于《{title}》教学的AI助手。你的任务是引导学生思考，\
                     解答他们的疑问，激发他们对中国古典文学的兴趣。"
                ),
                prompt: format!("学生关于《{title}》提出了一个问题：{question}\n\n参考文本背景：{context}"),
                temperature: self.tutor_temperature,
            },
        }
    }

    /// Narration instruction wrapped around the text to read aloud
    #[must_use]
    pub fn narration(&self, text: &str) -> String {
        format!(
            "请用沉稳、典雅、充满感情的语调朗读这段《{}》原文：\n\n{text}",
            self.title
        )
    }
}
