//! Plain-text rendering of engine snapshots.
//!
//! [`View`] keeps the latest snapshot of every session and turns each
//! incoming [`CompanionMessage`] into the lines worth printing.

use std::fmt::Write as _;

use companion_core::{
    ChatMessage, ChatStatus, CompanionMessage, ExplanationState, ExplanationStatus, MessageRole,
    NotifyLevel, OptionVerdict, QuizState, SpeechState, Work,
};

/// Last known state of the engine
#[derive(Debug)]
pub struct View {
    work: Work,
    explanation: ExplanationState,
    speech: SpeechState,
    messages: Vec<ChatMessage>,
    chat_status: ChatStatus,
    quiz: Option<QuizState>,
}

impl View {
    pub fn new(work: Work) -> Self {
        Self {
            work,
            explanation: ExplanationState::default(),
            speech: SpeechState::default(),
            messages: Vec::new(),
            chat_status: ChatStatus::Idle,
            quiz: None,
        }
    }

    /// Record `msg`, returning what changed in printable form
    pub fn apply(&mut self, msg: CompanionMessage) -> Option<String> {
        match msg {
            CompanionMessage::Explanation(state) => {
                let was_active = self.explanation.active_paragraph_id.is_some();
                self.explanation = state;
                self.explanation_update(was_active)
            }
            CompanionMessage::Speech(state) => {
                let previous = self.speech.speaking_paragraph_id;
                self.speech = state;
                match (previous, state.speaking_paragraph_id) {
                    (_, Some(id)) if previous != Some(id) => Some(format!("♪ 正在准备第{id}段朗读…")),
                    (Some(id), None) => Some(format!("♪ 第{id}段已释放朗读，可以朗读其他段落")),
                    _ => None,
                }
            }
            CompanionMessage::Chat { messages, status } => {
                let out = self.chat_update(&messages, status);
                self.messages = messages;
                self.chat_status = status;
                out
            }
            CompanionMessage::Quiz(state) => {
                let first = self.quiz.is_none();
                self.quiz = Some(state);
                // the initial snapshot is shown on demand only
                (!first).then(|| self.quiz_text())
            }
            CompanionMessage::Notify { level, message } => {
                let tag = match level {
                    NotifyLevel::Info => "info",
                    NotifyLevel::Warning => "warning",
                    NotifyLevel::Error => "error",
                };
                Some(format!("[{tag}] {message}"))
            }
            CompanionMessage::Quit { message } => message,
        }
    }

    fn explanation_update(&self, was_active: bool) -> Option<String> {
        let state = &self.explanation;
        let Some(id) = state.active_paragraph_id else {
            return was_active.then(|| "解析已关闭".to_string());
        };
        let text = state.text.as_deref().unwrap_or_default();
        match state.status {
            ExplanationStatus::Loading => Some(format!("[第{id}段] 正在解析…")),
            ExplanationStatus::Ready => Some(format!("[第{id}段 · 解析]\n{text}")),
            ExplanationStatus::Error => Some(format!("[第{id}段 · 出错] {text}")),
            ExplanationStatus::Idle => None,
        }
    }

    fn chat_update(&self, messages: &[ChatMessage], status: ChatStatus) -> Option<String> {
        let known = self.messages.len();
        let continues = known > 0
            && messages.len() >= known
            && messages[..known] == self.messages[..];
        // first snapshot or a reset: show everything
        let new = if continues { &messages[known..] } else { messages };

        let mut out = String::new();
        for message in new {
            let _ = writeln!(out, "{}", format_message(message));
        }
        if status == ChatStatus::Awaiting && self.chat_status != ChatStatus::Awaiting {
            out.push_str("导师正在查阅古籍…\n");
        }
        let out = out.trim_end().to_string();
        (!out.is_empty()).then_some(out)
    }

    /// The original text, one numbered paragraph each
    pub fn reading_text(&self) -> String {
        let mut out = format!("《{}》 {}\n", self.work.title, self.work.author);
        for passage in &self.work.passages {
            let marker = if self.speech.speaking_paragraph_id == Some(passage.id) {
                " ♪"
            } else {
                ""
            };
            let _ = write!(out, "\n{:>2}. {}{marker}\n", passage.id, passage.content);
        }
        out.trim_end().to_string()
    }

    /// Translations and annotations
    pub fn analysis_text(&self) -> String {
        let mut out = String::new();
        for passage in &self.work.passages {
            let _ = writeln!(out, "{:>2}. {}", passage.id, passage.translation);
            for annotation in &passage.annotations {
                let _ = write!(out, "    · {}：{}", annotation.word, annotation.meaning);
                if let Some(origin) = &annotation.origin {
                    let _ = write!(out, "（{origin}）");
                }
                out.push('\n');
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }

    /// The whole conversation
    pub fn chat_text(&self) -> String {
        let mut out = self
            .messages
            .iter()
            .map(format_message)
            .collect::<Vec<_>>()
            .join("\n");
        if self.chat_status == ChatStatus::Awaiting {
            out.push_str("\n导师正在查阅古籍…");
        }
        out
    }

    /// The current question with reveal markers, or the final score
    pub fn quiz_text(&self) -> String {
        let Some(quiz) = &self.quiz else {
            return "测验尚未加载".to_string();
        };
        if quiz.finished {
            let percentage = quiz.percentage().unwrap_or(0);
            return format!(
                "测验完成！得分 {}/{}（{percentage}%）\n输入 reset-quiz 重新开始",
                quiz.score,
                quiz.questions.len()
            );
        }
        let Some(question) = quiz.current_question() else {
            return String::new();
        };

        let (number, total) = quiz.progress();
        let mut out = format!("第 {number}/{total} 题  当前得分 {}\n{}\n", quiz.score, question.prompt);
        for (index, option) in question.options.iter().enumerate() {
            let marker = match quiz.option_verdict(index) {
                OptionVerdict::Pending => " ",
                OptionVerdict::Correct => "✓",
                OptionVerdict::WrongSelection => "✗",
                OptionVerdict::Dimmed => "·",
            };
            let _ = writeln!(out, "  {marker} {}. {option}", index + 1);
        }
        if let Some(explanation) = quiz.explanation() {
            let _ = writeln!(out, "解析：{explanation}");
        }
        out.trim_end().to_string()
    }
}

fn format_message(message: &ChatMessage) -> String {
    let who = match message.role {
        MessageRole::User => "你",
        MessageRole::Assistant => "导师",
    };
    format!("{who}：{}", message.content)
}
