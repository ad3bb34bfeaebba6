//! crates/docsensei_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, keeping the
//! core independent of the quiz backend, the chat backend and preference storage.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{QuizQuestion, Theme};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("External service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Quiz Provider Payloads
//=========================================================================================

/// What the quiz provider is asked about.
#[derive(Debug, Clone)]
pub struct QuizRequest {
    pub page_content: String,
    pub page_number: u32,
    pub document_id: Uuid,
}

/// The three answers a quiz provider can give for a page.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    Questions(Vec<QuizQuestion>),
    /// The page carries no learnable content (index, table of contents, ...).
    NotQuizable,
    /// The provider answered, but without a usable quiz.
    Unavailable(String),
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait QuizProvider: Send + Sync {
    /// Produces quiz questions for a single page.
    async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<QuizOutcome>;
}

#[async_trait]
pub trait ChatResponder: Send + Sync {
    /// Produces the assistant's reply to a reader's message about a page.
    async fn reply(&self, message: &str, page_number: u32) -> PortResult<String>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Returns the stored theme, or `None` if nothing was saved yet.
    async fn load_theme(&self) -> PortResult<Option<Theme>>;

    async fn save_theme(&self, theme: Theme) -> PortResult<()>;
}
