//! Study Content
//!
//! Immutable content supplied by the content provider: the passages of the
//! work being studied and the quiz that goes with it. The engine only reads
//! it; nothing here is mutated after loading.
//!
//! # File Format
//!
//! ```toml
//! title = "滕王阁序"
//! author = "王勃"
//!
//! [[passages]]
//! id = 1
//! content = "豫章故郡，洪都新府。"
//! translation = "这里是汉代的豫章郡城，如今是洪州的都督府。"
//! annotations = [{ word = "豫章", meaning = "汉代郡名" }]
//!
//! [[quiz]]
//! prompt = "“落霞与孤鹜齐飞”的下一句是？"
//! options = ["秋水共长天一色", "渔舟唱晚"]
//! correct_option = 0
//! explanation = "出自第三段。"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a content file
#[derive(Debug, Error)]
pub enum ContentError {
    /// Failed to read the content file
    #[error("Failed to read content file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse content file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Content violates an invariant
    #[error("Invalid content: {0}")]
    ValidationError(String),
}

/// A glossed word inside a passage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// The glossed word or phrase
    pub word: String,
    /// Its meaning
    pub meaning: String,
    /// Where the allusion comes from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// One immutable unit of the source text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Paragraph number, starting at 1
    pub id: u32,
    /// Original text
    pub content: String,
    /// Modern translation
    pub translation: String,
    /// Word glosses, in reading order
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// A multiple-choice question
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// The question text
    #[serde(alias = "question")]
    pub prompt: String,
    /// Answer options, in display order
    pub options: Vec<String>,
    /// Index into `options` of the correct answer
    #[serde(alias = "correct_answer")]
    pub correct_option: usize,
    /// Shown once the answer is revealed
    pub explanation: String,
}

/// The work being studied
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    /// Title, used in prompts
    pub title: String,
    /// Author
    #[serde(default)]
    pub author: String,
    /// Passages in reading order
    pub passages: Vec<Passage>,
    /// Quiz questions in asking order
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
}

impl Work {
    /// Parse and validate a work from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ContentError> {
        let work: Self = toml::from_str(text)?;
        work.validate()?;
        Ok(work)
    }

    /// Check the content invariants
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.passages.is_empty() {
            return Err(ContentError::ValidationError(
                "work has no passages".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for passage in &self.passages {
            if passage.id == 0 {
                return Err(ContentError::ValidationError(
                    "passage ids start at 1".to_string(),
                ));
            }
            if !seen.insert(passage.id) {
                return Err(ContentError::ValidationError(format!(
                    "duplicate passage id {}",
                    passage.id
                )));
            }
        }

        for (index, question) in self.quiz.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(ContentError::ValidationError(format!(
                    "quiz question {} needs at least two options",
                    index + 1
                )));
            }
            if question.correct_option >= question.options.len() {
                return Err(ContentError::ValidationError(format!(
                    "quiz question {} has correct option {} but only {} options",
                    index + 1,
                    question.correct_option,
                    question.options.len()
                )));
            }
        }

        Ok(())
    }

    /// Look up a passage by id
    #[must_use]
    pub fn passage(&self, id: u32) -> Option<&Passage> {
        self.passages.iter().find(|p| p.id == id)
    }

    /// The whole text, one passage per line (tutor context)
    #[must_use]
    pub fn full_text(&self) -> String {
        self.passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Load a work from a TOML file
pub fn load_work(path: &Path) -> Result<Work, ContentError> {
    let text = std::fs::read_to_string(path).map_err(|e| ContentError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let work = Work::from_toml_str(&text)?;

    tracing::info!(
        path = %path.display(),
        title = %work.title,
        passages = work.passages.len(),
        questions = work.quiz.len(),
        "Loaded study content"
    );

    Ok(work)
}
