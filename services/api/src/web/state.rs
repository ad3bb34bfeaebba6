//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use docsensei_core::domain::Theme;
use docsensei_core::ports::{ChatResponder, PreferenceStore, QuizProvider};
use docsensei_core::{AppMode, LearningSession, ModeController, ReadingSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub quiz_provider: Arc<dyn QuizProvider>,
    pub chat_responder: Arc<dyn ChatResponder>,
    pub preferences: Arc<dyn PreferenceStore>,
    /// The persisted theme, loaded once at startup and written through on toggle.
    pub theme: Arc<RwLock<Theme>>,
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The study state that exists only once a mode has been picked.
#[derive(Debug)]
pub enum StudySession {
    Learning(LearningSession),
    FreeReading(ReadingSession),
}

/// The state for a single, active WebSocket connection.
pub struct SessionState {
    pub session_id: Uuid,
    pub controller: ModeController,
    pub study: Option<StudySession>,
    pub upload_in_progress: bool,
    /// Cancelled on back-to-home and on disconnect; every delayed task holds a clone.
    pub cancellation_token: CancellationToken,
    /// Child of `cancellation_token`, replaced whenever the learning page changes.
    pub page_token: CancellationToken,
}

impl SessionState {
    pub fn new(session_id: Uuid) -> Self {
        let cancellation_token = CancellationToken::new();
        let page_token = cancellation_token.child_token();
        Self {
            session_id,
            controller: ModeController::new(),
            study: None,
            upload_in_progress: false,
            cancellation_token,
            page_token,
        }
    }

    pub fn mode(&self) -> AppMode {
        self.controller.mode()
    }

    pub fn learning_mut(&mut self) -> Option<&mut LearningSession> {
        match self.study.as_mut() {
            Some(StudySession::Learning(learning)) => Some(learning),
            _ => None,
        }
    }

    pub fn reading_mut(&mut self) -> Option<&mut ReadingSession> {
        match self.study.as_mut() {
            Some(StudySession::FreeReading(reading)) => Some(reading),
            _ => None,
        }
    }

    /// Ends the current session lifetime: pending delayed work is voided and a
    /// fresh token is issued for whatever comes next.
    pub fn renew_lifetime(&mut self) {
        self.cancellation_token.cancel();
        self.cancellation_token = CancellationToken::new();
        self.page_token = self.cancellation_token.child_token();
    }

    /// Voids page-scoped work (the quiz prompt) and returns the new page token.
    pub fn renew_page_token(&mut self) -> CancellationToken {
        self.page_token.cancel();
        self.page_token = self.cancellation_token.child_token();
        self.page_token.clone()
    }
}

/// Sleeps for `delay` unless `token` fires first. Returns `true` if the full
/// delay elapsed.
pub async fn sleep_unless_cancelled(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => !token.is_cancelled(),
    }
}
