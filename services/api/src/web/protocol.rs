//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the document study application.

use chrono::{DateTime, Utc};
use docsensei_core::domain::{ChatMessage, Document, Page, QuizQuestion, Sender};
use docsensei_core::StudyMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// The study mode picked on the mode-selection screen.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModeChoice {
    Learning,
    FreeReading,
}

impl From<ModeChoice> for StudyMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Learning => StudyMode::Learning,
            ModeChoice::FreeReading => StudyMode::FreeReading,
        }
    }
}

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Declares the picked file. Only the declared media type is validated.
    Upload { file_name: String, media_type: String },

    SelectMode { mode: ModeChoice },

    /// Abandons the document and every bit of derived state.
    BackToHome,

    NextPage,
    PreviousPage,
    JumpToPage { page_index: usize },

    /// Requests a quiz for the current page (learning mode).
    StartQuiz,
    SelectAnswer { option: usize },
    SubmitAnswer,
    NextQuestion,
    ResetQuiz,

    /// Sends a message to the reading assistant (free reading mode).
    SendChat { text: String },
}

//=========================================================================================
// Views of Core Types
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PageView {
    pub id: String,
    pub number: u32,
    pub content: String,
    pub completed: bool,
}

impl PageView {
    pub fn new(page: &Page, completed: bool) -> Self {
        Self {
            id: page.id.clone(),
            number: page.number,
            content: page.content.clone(),
            completed,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DocumentView {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub content: String,
    pub total_pages: usize,
    pub pages: Vec<PageView>,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: Option<String>,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            kind: doc.kind.as_str().to_string(),
            content: doc.content.clone(),
            total_pages: doc.total_pages(),
            pages: doc.pages.iter().map(|p| PageView::new(p, false)).collect(),
            uploaded_at: doc.uploaded_at,
            file_url: doc.file_url.clone(),
        }
    }
}

/// A question as shown before answering; the correct answer is withheld.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
}

impl From<&QuizQuestion> for QuestionView {
    fn from(q: &QuizQuestion) -> Self {
        Self {
            id: q.id.clone(),
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatMessageView {
    pub id: Uuid,
    pub text: String,
    pub sender: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(m: &ChatMessage) -> Self {
        Self {
            id: m.id,
            text: m.text.clone(),
            sender: match m.sender {
                Sender::User => "user",
                Sender::Ai => "ai",
            },
            timestamp: m.timestamp,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when the connection is established.
    SessionReady { session_id: Uuid, mode: String },

    /// The file passed validation and is being processed.
    UploadStarted { file_name: String },

    /// The file was refused; the client stays on the upload screen.
    UploadRejected { message: String },

    DocumentReady { document: DocumentView },

    ModeChanged { mode: String },

    PageChanged {
        page: PageView,
        page_index: usize,
        total_pages: usize,
        completed_pages: Vec<usize>,
        progress: f64,
    },

    NavigationRejected { reason: String },

    /// The reader has spent long enough on an unfinished page; show the quiz.
    QuizPrompt { page_index: usize },

    QuizLoading { page_index: usize },

    QuizStarted {
        page_index: usize,
        questions: Vec<QuestionView>,
        question_index: usize,
        pass_threshold: u32,
    },

    AnswerRevealed {
        question_index: usize,
        selected: usize,
        correct: bool,
        correct_answer: usize,
        explanation: Option<String>,
        correct_count: u32,
    },

    QuizAdvanced { question_index: usize },

    QuizPassed { page_index: usize, correct_count: u32 },

    QuizReset { page_index: usize },

    PageCompleted {
        page_index: usize,
        completed_pages: Vec<usize>,
        progress: f64,
    },

    PageReopened {
        page_index: usize,
        completed_pages: Vec<usize>,
        progress: f64,
    },

    /// The provider says the page has nothing to quiz on.
    NotQuizable { page_index: usize },

    QuizUnavailable { message: String },

    ChatMessage { message: ChatMessageView },

    /// Reports a request that is not valid in the current state.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }
}
