//! services/api/src/web/quiz_task.rs
//!
//! The asynchronous side of learning mode: fetching a quiz from the provider,
//! confirming a pass after a short pause, and prompting the reader to take the
//! quiz once they have lingered on an unfinished page.
//!
//! Every task holds a `CancellationToken` and re-checks it under the session
//! lock before touching state, so work that outlives its session is dropped.

use crate::web::{
    dispatch::{announce_learning_page, completion_message, SessionContext, NOT_LEARNING},
    protocol::{QuestionView, ServerMessage},
    state::sleep_unless_cancelled,
};
use docsensei_core::ports::{QuizOutcome, QuizRequest};
use docsensei_core::PASS_THRESHOLD;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const NO_QUIZ_MESSAGE: &str = "No quiz available for this page.";
const FETCH_FAILED_MESSAGE: &str = "The quiz could not be loaded. Please try again.";

/// Claims the fetch slot for the current page and spawns the provider call.
pub async fn start_quiz(ctx: &SessionContext) {
    let mut session = ctx.session.lock().await;
    let lifetime = session.cancellation_token.clone();
    let Some(learning) = session.learning_mut() else {
        ctx.outbox.send(ServerMessage::error(NOT_LEARNING));
        return;
    };
    let fetch = match learning.begin_quiz_fetch() {
        Ok(fetch) => fetch,
        Err(e) => {
            ctx.outbox.send(ServerMessage::error(e));
            return;
        }
    };

    let page_index = learning.current_page_index();
    let document_id = learning.document().id;
    let request = learning.current_page().map(|page| QuizRequest {
        page_content: page.content.clone(),
        page_number: page.number,
        document_id,
    });
    let Some(request) = request else {
        learning.finish_quiz_fetch(fetch);
        ctx.outbox.send(ServerMessage::error("the current page is missing"));
        return;
    };

    info!("Requesting a quiz for page {}", request.page_number);
    ctx.outbox.send(ServerMessage::QuizLoading { page_index });

    let ctx = ctx.clone();
    tokio::spawn(async move { fetch_quiz(ctx, request, page_index, fetch, lifetime).await });
}

async fn fetch_quiz(
    ctx: SessionContext,
    request: QuizRequest,
    page_index: usize,
    fetch: u64,
    lifetime: CancellationToken,
) {
    let provider = ctx.app_state.quiz_provider.clone();
    let result = tokio::select! {
        _ = lifetime.cancelled() => {
            debug!("Quiz fetch for page {} cancelled.", request.page_number);
            return;
        }
        result = provider.generate_quiz(&request) => result,
    };

    let mut session = ctx.session.lock().await;
    if lifetime.is_cancelled() {
        return;
    }
    let auto_advance = ctx.app_state.config.quiz_auto_advance;
    let Some(learning) = session.learning_mut() else {
        return;
    };
    if !learning.finish_quiz_fetch(fetch) {
        info!(
            "Discarding quiz for page {}, the request was superseded.",
            request.page_number
        );
        return;
    }

    match result {
        Ok(QuizOutcome::Questions(questions)) => match learning.start_quiz(questions) {
            Ok(quiz) => {
                ctx.outbox.send(ServerMessage::QuizStarted {
                    page_index,
                    questions: quiz.engine.questions().iter().map(QuestionView::from).collect(),
                    question_index: 0,
                    pass_threshold: PASS_THRESHOLD,
                });
            }
            Err(e) => {
                warn!("Unusable quiz for page {}: {}", request.page_number, e);
                ctx.outbox.send(ServerMessage::QuizUnavailable {
                    message: NO_QUIZ_MESSAGE.to_string(),
                });
            }
        },
        Ok(QuizOutcome::NotQuizable) => {
            let outcome = learning.mark_not_quizable(page_index, auto_advance);
            info!(
                "Page {} is not quizable, marked complete (advanced to {:?}).",
                request.page_number, outcome.advanced_to
            );
            ctx.outbox.send(ServerMessage::NotQuizable { page_index });
            ctx.outbox.send(completion_message(learning, page_index));
            if outcome.advanced_to.is_some_and(|next| next != page_index) {
                announce_learning_page(&ctx, &mut session, true);
            }
        }
        Ok(QuizOutcome::Unavailable(message)) => {
            ctx.outbox.send(ServerMessage::QuizUnavailable { message });
        }
        Err(e) => {
            error!("Quiz provider failed for page {}: {}", request.page_number, e);
            ctx.outbox.send(ServerMessage::QuizUnavailable {
                message: FETCH_FAILED_MESSAGE.to_string(),
            });
        }
    }
}

/// Marks the page complete once the pass has been on screen for a moment.
pub fn schedule_pass_confirmation(
    ctx: &SessionContext,
    page_index: usize,
    attempt: u64,
    lifetime: CancellationToken,
) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if !sleep_unless_cancelled(&lifetime, ctx.app_state.config.quiz_pass_delay).await {
            return;
        }
        let mut session = ctx.session.lock().await;
        if lifetime.is_cancelled() {
            return;
        }
        let Some(learning) = session.learning_mut() else {
            return;
        };
        if learning.confirm_quiz_passed(page_index, attempt) {
            ctx.outbox.send(completion_message(learning, page_index));
        } else {
            debug!("Ignoring stale pass for attempt {}.", attempt);
        }
    });
}

/// Prompts the quiz if the reader is still on `page_index` after the delay.
pub fn schedule_prompt(ctx: &SessionContext, page_index: usize, page_token: CancellationToken) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if !sleep_unless_cancelled(&page_token, ctx.app_state.config.quiz_prompt_delay).await {
            return;
        }
        let mut session = ctx.session.lock().await;
        if page_token.is_cancelled() {
            return;
        }
        let Some(learning) = session.learning_mut() else {
            return;
        };
        if learning.current_page_index() == page_index
            && learning.needs_quiz_prompt()
            && !learning.quiz_fetch_pending()
        {
            ctx.outbox.send(ServerMessage::QuizPrompt { page_index });
        }
    });
}
