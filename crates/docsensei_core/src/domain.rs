//! crates/docsensei_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// The two document families the intake accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Word => "Word",
        }
    }
}

/// An uploaded document and its pages.
///
/// Created once by the intake and never mutated afterwards; page completion
/// is tracked by the progression engine, not on the pages themselves.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub kind: DocumentKind,
    pub content: String,
    pub pages: Vec<Page>,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: Option<String>,
}

impl Document {
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// Looks up a page by its 0-based index.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }
}

/// A single page. `number` is 1-based and always equals its position + 1.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: String,
    pub number: u32,
    pub content: String,
    pub quiz_questions: Option<Vec<QuizQuestion>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionError {
    #[error("question '{0}' has no options")]
    NoOptions(String),
    #[error("question '{id}' marks option {correct} correct but only has {len} options")]
    AnswerOutOfRange { id: String, correct: usize, len: usize },
}

/// A multiple-choice question. `correct_answer` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// Builds a question, rejecting an answer index that points outside `options`.
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let q = Self {
            id: id.into(),
            question: question.into(),
            options,
            correct_answer,
            explanation,
        };
        q.validate()?;
        Ok(q)
    }

    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions(self.id.clone()));
        }
        if self.correct_answer >= self.options.len() {
            return Err(QuestionError::AnswerOutOfRange {
                id: self.id.clone(),
                correct: self.correct_answer,
                len: self.options.len(),
            });
        }
        Ok(())
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
}

/// One entry of the free-reading chat transcript.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// The persisted colour-scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parses a stored flag. Anything other than `dark` reads as light.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("dark") {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
