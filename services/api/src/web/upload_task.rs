//! services/api/src/web/upload_task.rs
//!
//! Upload intake: the declared file is validated immediately, then processed
//! after a simulated delay into the twelve-page document.

use crate::web::{
    dispatch::SessionContext,
    protocol::{DocumentView, ServerMessage},
    state::{sleep_unless_cancelled, SessionState},
};
use docsensei_core::intake::{self, UploadedFile};
use docsensei_core::{AppMode, ModeError, ValidationError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const REJECTION_MESSAGE: &str = "Please upload a PDF or Word document.";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("a document is already being processed")]
    AlreadyProcessing,
    #[error(transparent)]
    Mode(#[from] ModeError),
}

impl UploadError {
    fn into_message(self) -> ServerMessage {
        match self {
            UploadError::Mode(e) => ServerMessage::error(e),
            UploadError::Invalid(ValidationError::UnsupportedMediaType(_)) => {
                ServerMessage::UploadRejected {
                    message: REJECTION_MESSAGE.to_string(),
                }
            }
            other => ServerMessage::UploadRejected {
                message: other.to_string(),
            },
        }
    }
}

fn check_upload(session: &SessionState, file: &UploadedFile) -> Result<(), UploadError> {
    if session.mode() != AppMode::Upload {
        return Err(ModeError::InvalidTransition {
            action: "accept a document",
            mode: session.mode(),
        }
        .into());
    }
    if session.upload_in_progress {
        return Err(UploadError::AlreadyProcessing);
    }
    intake::validate(file)?;
    Ok(())
}

pub async fn start_upload(ctx: &SessionContext, file: UploadedFile) {
    let mut session = ctx.session.lock().await;
    if let Err(e) = check_upload(&session, &file) {
        warn!(
            "Session {}: upload of '{}' ({}) refused: {}",
            session.session_id, file.name, file.media_type, e
        );
        ctx.outbox.send(e.into_message());
        return;
    }

    info!(
        "Session {}: processing '{}' ({})",
        session.session_id, file.name, file.media_type
    );
    session.upload_in_progress = true;
    let lifetime = session.cancellation_token.clone();
    ctx.outbox.send(ServerMessage::UploadStarted {
        file_name: file.name.clone(),
    });

    let ctx = ctx.clone();
    tokio::spawn(async move { process_upload(ctx, file, lifetime).await });
}

async fn process_upload(ctx: SessionContext, file: UploadedFile, lifetime: CancellationToken) {
    if !sleep_unless_cancelled(&lifetime, ctx.app_state.config.upload_delay).await {
        return;
    }
    let mut session = ctx.session.lock().await;
    if lifetime.is_cancelled() {
        return;
    }
    session.upload_in_progress = false;

    let result = intake::build_document(&file)
        .map_err(UploadError::from)
        .and_then(|doc| {
            session
                .controller
                .document_uploaded(doc)
                .map_err(UploadError::from)
        });
    match result {
        Ok(document) => {
            info!(
                "Session {}: '{}' ready with {} pages",
                session.session_id,
                document.name,
                document.total_pages()
            );
            ctx.outbox.send(ServerMessage::DocumentReady {
                document: DocumentView::from(&*document),
            });
            ctx.outbox.send(ServerMessage::ModeChanged {
                mode: session.mode().as_str().to_string(),
            });
        }
        Err(e) => {
            warn!("Session {}: upload failed: {}", session.session_id, e);
            ctx.outbox.send(e.into_message());
        }
    }
}
