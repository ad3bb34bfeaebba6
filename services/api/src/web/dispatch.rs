//! services/api/src/web/dispatch.rs
//!
//! Routes each `ClientMessage` to the session operation it names and turns the
//! result into `ServerMessage`s. Delayed effects are handed to the task modules.

use crate::web::{
    chat_task,
    outbox::Outbox,
    protocol::{ChatMessageView, ClientMessage, PageView, ServerMessage},
    quiz_task,
    state::{AppState, SessionState, StudySession},
    upload_task,
};
use docsensei_core::{
    LearningSession, ReadingSession, SessionError, StudyMode, UploadedFile,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub(crate) const NOT_LEARNING: &str = "quizzes are only available in learning mode";

/// Everything a handler or a delayed task needs to act on one connection.
#[derive(Clone)]
pub struct SessionContext {
    pub app_state: Arc<AppState>,
    pub session: Arc<Mutex<SessionState>>,
    pub outbox: Outbox,
}

impl SessionContext {
    pub fn new(
        app_state: Arc<AppState>,
        session_id: Uuid,
    ) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (outbox, rx) = Outbox::new();
        let ctx = Self {
            app_state,
            session: Arc::new(Mutex::new(SessionState::new(session_id))),
            outbox,
        };
        (ctx, rx)
    }
}

#[derive(Debug, Clone, Copy)]
enum Navigation {
    Next,
    Previous,
    Jump(usize),
}

/// Applies one client message to the session.
pub async fn handle_client_message(ctx: &SessionContext, msg: ClientMessage) {
    match msg {
        ClientMessage::Upload {
            file_name,
            media_type,
        } => upload_task::start_upload(ctx, UploadedFile::new(file_name, media_type)).await,
        ClientMessage::SelectMode { mode } => select_mode(ctx, mode.into()).await,
        ClientMessage::BackToHome => back_to_home(ctx).await,
        ClientMessage::NextPage => navigate(ctx, Navigation::Next).await,
        ClientMessage::PreviousPage => navigate(ctx, Navigation::Previous).await,
        ClientMessage::JumpToPage { page_index } => {
            navigate(ctx, Navigation::Jump(page_index)).await
        }
        ClientMessage::StartQuiz => quiz_task::start_quiz(ctx).await,
        ClientMessage::SelectAnswer { option } => select_answer(ctx, option).await,
        ClientMessage::SubmitAnswer => submit_answer(ctx).await,
        ClientMessage::NextQuestion => next_question(ctx).await,
        ClientMessage::ResetQuiz => reset_quiz(ctx).await,
        ClientMessage::SendChat { text } => chat_task::send_chat(ctx, text).await,
    }
}

//=========================================================================================
// Mode Transitions
//=========================================================================================

async fn select_mode(ctx: &SessionContext, mode: StudyMode) {
    let mut session = ctx.session.lock().await;
    let document = match session.controller.select_mode(mode) {
        Ok(document) => document,
        Err(e) => {
            warn!("Session {}: {}", session.session_id, e);
            ctx.outbox.send(ServerMessage::error(e));
            return;
        }
    };
    info!(
        "Session {}: studying '{}' in {} mode",
        session.session_id,
        document.name,
        session.mode().as_str()
    );
    ctx.outbox.send(ServerMessage::ModeChanged {
        mode: session.mode().as_str().to_string(),
    });

    match mode {
        StudyMode::Learning => {
            let learning = LearningSession::new(document, ctx.app_state.config.jump_policy);
            session.study = Some(StudySession::Learning(learning));
            announce_learning_page(ctx, &mut session, true);
        }
        StudyMode::FreeReading => {
            let reading = ReadingSession::new(document);
            for message in reading.transcript().messages() {
                ctx.outbox.send(ServerMessage::ChatMessage {
                    message: ChatMessageView::from(message),
                });
            }
            ctx.outbox.send(reading_page_message(&reading));
            session.study = Some(StudySession::FreeReading(reading));
        }
    }
}

async fn back_to_home(ctx: &SessionContext) {
    let mut session = ctx.session.lock().await;
    if let Err(e) = session.controller.back_to_home() {
        ctx.outbox.send(ServerMessage::error(e));
        return;
    }
    session.study = None;
    session.upload_in_progress = false;
    session.renew_lifetime();
    info!("Session {}: back to upload, session state discarded", session.session_id);
    ctx.outbox.send(ServerMessage::ModeChanged {
        mode: session.mode().as_str().to_string(),
    });
}

//=========================================================================================
// Navigation
//=========================================================================================

async fn navigate(ctx: &SessionContext, nav: Navigation) {
    let mut session = ctx.session.lock().await;
    let mode = session.mode();
    match session.study.as_mut() {
        Some(StudySession::Learning(learning)) => {
            let before = learning.current_page_index();
            let result = match nav {
                Navigation::Next => learning.next_page(),
                Navigation::Previous => Ok(learning.previous_page()),
                Navigation::Jump(index) => learning.jump_to(index),
            };
            match result {
                Ok(index) => {
                    debug!("Learning cursor {:?}: {} -> {}", nav, before, index);
                    announce_learning_page(ctx, &mut session, index != before);
                }
                Err(e) => reject(ctx, e),
            }
        }
        Some(StudySession::FreeReading(reading)) => {
            let result = match nav {
                Navigation::Next => Ok(reading.next_page()),
                Navigation::Previous => Ok(reading.previous_page()),
                Navigation::Jump(index) => reading.jump_to(index),
            };
            match result {
                Ok(_) => {
                    ctx.outbox.send(reading_page_message(reading));
                }
                Err(e) => reject(ctx, e),
            }
        }
        None => {
            ctx.outbox.send(ServerMessage::error(format!(
                "cannot change pages while in '{}'",
                mode.as_str()
            )));
        }
    }
}

//=========================================================================================
// Quiz Interaction
//=========================================================================================

async fn select_answer(ctx: &SessionContext, option: usize) {
    let mut session = ctx.session.lock().await;
    let Some(learning) = session.learning_mut() else {
        ctx.outbox.send(ServerMessage::error(NOT_LEARNING));
        return;
    };
    if let Err(e) = learning.select_answer(option) {
        reject(ctx, e);
    }
}

async fn submit_answer(ctx: &SessionContext) {
    let mut session = ctx.session.lock().await;
    let lifetime = session.cancellation_token.clone();
    let Some(learning) = session.learning_mut() else {
        ctx.outbox.send(ServerMessage::error(NOT_LEARNING));
        return;
    };
    let reveal = match learning.submit_answer() {
        Ok(reveal) => reveal,
        Err(e) => return reject(ctx, e),
    };
    let Some(quiz) = learning.quiz() else {
        return;
    };
    let explanation = quiz
        .engine
        .questions()
        .get(reveal.question)
        .and_then(|q| q.explanation.clone());

    ctx.outbox.send(ServerMessage::AnswerRevealed {
        question_index: reveal.question,
        selected: reveal.selected,
        correct: reveal.correct,
        correct_answer: reveal.correct_answer,
        explanation,
        correct_count: reveal.correct_count,
    });

    if reveal.passed {
        info!(
            "Quiz passed on page {} (attempt {})",
            quiz.page_index + 1,
            quiz.attempt
        );
        ctx.outbox.send(ServerMessage::QuizPassed {
            page_index: quiz.page_index,
            correct_count: reveal.correct_count,
        });
        quiz_task::schedule_pass_confirmation(ctx, quiz.page_index, quiz.attempt, lifetime);
    }
}

async fn next_question(ctx: &SessionContext) {
    let mut session = ctx.session.lock().await;
    let Some(learning) = session.learning_mut() else {
        ctx.outbox.send(ServerMessage::error(NOT_LEARNING));
        return;
    };
    match learning.next_question() {
        Ok(question_index) => {
            ctx.outbox.send(ServerMessage::QuizAdvanced { question_index });
        }
        Err(e) => reject(ctx, e),
    }
}

async fn reset_quiz(ctx: &SessionContext) {
    let mut session = ctx.session.lock().await;
    let Some(learning) = session.learning_mut() else {
        ctx.outbox.send(ServerMessage::error(NOT_LEARNING));
        return;
    };
    match learning.reset_quiz() {
        Ok(page_index) => {
            ctx.outbox.send(ServerMessage::QuizReset { page_index });
            ctx.outbox.send(completion_message(learning, page_index));
        }
        Err(e) => reject(ctx, e),
    }
}

//=========================================================================================
// Message Helpers
//=========================================================================================

fn reject(ctx: &SessionContext, err: SessionError) {
    let msg = match err {
        SessionError::Navigation(reason) => ServerMessage::NavigationRejected {
            reason: reason.to_string(),
        },
        other => ServerMessage::error(other),
    };
    ctx.outbox.send(msg);
}

/// Sends the learning cursor to the client. A real page change also voids the
/// previous page's prompt and schedules a new one if the page is unfinished.
pub(crate) fn announce_learning_page(
    ctx: &SessionContext,
    session: &mut SessionState,
    page_changed: bool,
) {
    let page_token = page_changed.then(|| session.renew_page_token());
    let Some(StudySession::Learning(learning)) = session.study.as_ref() else {
        return;
    };
    ctx.outbox.send(learning_page_message(learning));
    if let Some(token) = page_token {
        if learning.needs_quiz_prompt() {
            quiz_task::schedule_prompt(ctx, learning.current_page_index(), token);
        }
    }
}

pub(crate) fn learning_page_message(learning: &LearningSession) -> ServerMessage {
    let progression = learning.progression();
    let page_index = progression.current_page_index();
    let Some(page) = learning.current_page() else {
        return ServerMessage::error(format!("page {} is missing", page_index + 1));
    };
    ServerMessage::PageChanged {
        page: PageView::new(page, progression.is_completed(page_index)),
        page_index,
        total_pages: progression.total_pages(),
        completed_pages: progression.completed_pages().iter().copied().collect(),
        progress: progression.progress(),
    }
}

fn reading_page_message(reading: &ReadingSession) -> ServerMessage {
    let page_index = reading.current_page_index();
    let Some(page) = reading.current_page() else {
        return ServerMessage::error(format!("page {} is missing", page_index + 1));
    };
    ServerMessage::PageChanged {
        page: PageView::new(page, false),
        page_index,
        total_pages: reading.document().total_pages(),
        completed_pages: Vec::new(),
        progress: reading.progress(),
    }
}

/// `page_completed` or `page_reopened`, depending on where `page_index` stands now.
pub(crate) fn completion_message(learning: &LearningSession, page_index: usize) -> ServerMessage {
    let progression = learning.progression();
    let completed_pages = progression.completed_pages().iter().copied().collect();
    let progress = progression.progress();
    if progression.is_completed(page_index) {
        ServerMessage::PageCompleted {
            page_index,
            completed_pages,
            progress,
        }
    } else {
        ServerMessage::PageReopened {
            page_index,
            completed_pages,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::web::protocol::ModeChoice;
    use async_trait::async_trait;
    use docsensei_core::domain::{QuizQuestion, Theme};
    use docsensei_core::ports::{
        ChatResponder, PortError, PortResult, PreferenceStore, QuizOutcome, QuizProvider,
        QuizRequest,
    };
    use docsensei_core::AppMode;
    use std::time::Duration;
    use tokio::sync::RwLock;

    //--- Fake Ports ---

    struct FixedQuiz {
        outcome: QuizOutcome,
        latency: Duration,
    }

    #[async_trait]
    impl QuizProvider for FixedQuiz {
        async fn generate_quiz(&self, _request: &QuizRequest) -> PortResult<QuizOutcome> {
            tokio::time::sleep(self.latency).await;
            Ok(self.outcome.clone())
        }
    }

    struct FailingQuiz;

    #[async_trait]
    impl QuizProvider for FailingQuiz {
        async fn generate_quiz(&self, _request: &QuizRequest) -> PortResult<QuizOutcome> {
            Err(PortError::Unavailable("connection refused".to_string()))
        }
    }

    struct PageEcho;

    #[async_trait]
    impl ChatResponder for PageEcho {
        async fn reply(&self, _message: &str, page_number: u32) -> PortResult<String> {
            Ok(format!("About page {page_number}"))
        }
    }

    struct NoPreferences;

    #[async_trait]
    impl PreferenceStore for NoPreferences {
        async fn load_theme(&self) -> PortResult<Option<Theme>> {
            Ok(None)
        }
        async fn save_theme(&self, _theme: Theme) -> PortResult<()> {
            Ok(())
        }
    }

    //--- Harness ---

    fn four_questions() -> Vec<QuizQuestion> {
        (0..4)
            .map(|i| {
                QuizQuestion::new(
                    format!("q{i}"),
                    format!("Question {i}?"),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    1,
                    Some(format!("because {i}")),
                )
                .unwrap()
            })
            .collect()
    }

    fn test_config() -> Config {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.upload_delay = Duration::ZERO;
        config.chat_reply_delay = Duration::ZERO;
        config.quiz_pass_delay = Duration::ZERO;
        config.quiz_prompt_delay = Duration::from_secs(3600);
        config
    }

    fn harness(
        config: Config,
        provider: Arc<dyn QuizProvider>,
    ) -> (SessionContext, mpsc::UnboundedReceiver<ServerMessage>) {
        let app_state = Arc::new(AppState {
            config: Arc::new(config),
            quiz_provider: provider,
            chat_responder: Arc::new(PageEcho),
            preferences: Arc::new(NoPreferences),
            theme: Arc::new(RwLock::new(Theme::Light)),
        });
        SessionContext::new(app_state, Uuid::new_v4())
    }

    fn questions_provider() -> Arc<dyn QuizProvider> {
        Arc::new(FixedQuiz {
            outcome: QuizOutcome::Questions(four_questions()),
            latency: Duration::ZERO,
        })
    }

    /// Collects everything sent until the outbox has been quiet for a moment.
    async fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await
        {
            out.push(msg);
        }
        out
    }

    async fn send(
        ctx: &SessionContext,
        rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
        msg: ClientMessage,
    ) -> Vec<ServerMessage> {
        handle_client_message(ctx, msg).await;
        drain(rx).await
    }

    async fn upload_pdf(ctx: &SessionContext, rx: &mut mpsc::UnboundedReceiver<ServerMessage>) {
        send(
            ctx,
            rx,
            ClientMessage::Upload {
                file_name: "notes.pdf".to_string(),
                media_type: "application/pdf".to_string(),
            },
        )
        .await;
    }

    async fn enter(
        ctx: &SessionContext,
        rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
        mode: ModeChoice,
    ) -> Vec<ServerMessage> {
        upload_pdf(ctx, rx).await;
        send(ctx, rx, ClientMessage::SelectMode { mode }).await
    }

    async fn answer(
        ctx: &SessionContext,
        rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
        option: usize,
    ) -> Vec<ServerMessage> {
        handle_client_message(ctx, ClientMessage::SelectAnswer { option }).await;
        let out = send(ctx, rx, ClientMessage::SubmitAnswer).await;
        handle_client_message(ctx, ClientMessage::NextQuestion).await;
        drain(rx).await;
        out
    }

    fn page_index_of(messages: &[ServerMessage]) -> Option<usize> {
        messages.iter().rev().find_map(|m| match m {
            ServerMessage::PageChanged { page_index, .. } => Some(*page_index),
            _ => None,
        })
    }

    //--- Upload & Mode ---

    #[tokio::test]
    async fn plain_text_upload_is_rejected_and_mode_stays_upload() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = send(
            &ctx,
            &mut rx,
            ClientMessage::Upload {
                file_name: "notes.txt".to_string(),
                media_type: "text/plain".to_string(),
            },
        )
        .await;

        assert_eq!(
            out,
            vec![ServerMessage::UploadRejected {
                message: "Please upload a PDF or Word document.".to_string()
            }]
        );
        let session = ctx.session.lock().await;
        assert_eq!(session.mode(), AppMode::Upload);
        assert!(!session.upload_in_progress);
    }

    #[tokio::test]
    async fn accepted_upload_produces_twelve_pages() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = send(
            &ctx,
            &mut rx,
            ClientMessage::Upload {
                file_name: "thesis.docx".to_string(),
                media_type:
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                        .to_string(),
            },
        )
        .await;

        assert!(matches!(out[0], ServerMessage::UploadStarted { .. }));
        let document = out
            .iter()
            .find_map(|m| match m {
                ServerMessage::DocumentReady { document } => Some(document.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(document.total_pages, 12);
        assert_eq!(document.kind, "Word");
        assert!(out.contains(&ServerMessage::ModeChanged {
            mode: "mode-selection".to_string()
        }));
        assert_eq!(ctx.session.lock().await.mode(), AppMode::ModeSelection);
    }

    #[tokio::test]
    async fn select_mode_before_upload_is_an_error() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = send(
            &ctx,
            &mut rx,
            ClientMessage::SelectMode {
                mode: ModeChoice::Learning,
            },
        )
        .await;
        assert!(matches!(out.as_slice(), [ServerMessage::Error { .. }]));
        assert_eq!(ctx.session.lock().await.mode(), AppMode::Upload);
    }

    #[tokio::test]
    async fn quiz_messages_outside_learning_are_errors() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        assert_eq!(out, vec![ServerMessage::error(NOT_LEARNING)]);
    }

    //--- Learning Mode ---

    #[tokio::test]
    async fn learning_starts_on_first_page() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = enter(&ctx, &mut rx, ModeChoice::Learning).await;
        assert!(out.contains(&ServerMessage::ModeChanged {
            mode: "learning".to_string()
        }));
        assert_eq!(page_index_of(&out), Some(0));
    }

    #[tokio::test]
    async fn locked_pages_are_rejected_until_the_quiz_is_passed() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        enter(&ctx, &mut rx, ModeChoice::Learning).await;

        let out = send(&ctx, &mut rx, ClientMessage::JumpToPage { page_index: 5 }).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::NavigationRejected { .. }]
        ));
        let out = send(&ctx, &mut rx, ClientMessage::NextPage).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::NavigationRejected { .. }]
        ));

        let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        assert_eq!(out[0], ServerMessage::QuizLoading { page_index: 0 });
        assert!(matches!(
            &out[1],
            ServerMessage::QuizStarted { questions, pass_threshold: 3, .. } if questions.len() == 4
        ));

        // Wrong on the first question, right on the next three.
        let first = answer(&ctx, &mut rx, 0).await;
        assert!(matches!(
            first[0],
            ServerMessage::AnswerRevealed {
                correct: false,
                correct_count: 0,
                ..
            }
        ));
        answer(&ctx, &mut rx, 1).await;
        answer(&ctx, &mut rx, 1).await;

        handle_client_message(&ctx, ClientMessage::SelectAnswer { option: 1 }).await;
        let out = send(&ctx, &mut rx, ClientMessage::SubmitAnswer).await;
        assert!(out.contains(&ServerMessage::QuizPassed {
            page_index: 0,
            correct_count: 3
        }));
        assert!(out.iter().any(|m| matches!(
            m,
            ServerMessage::PageCompleted { page_index: 0, completed_pages, .. } if completed_pages == &vec![0]
        )));

        let out = send(&ctx, &mut rx, ClientMessage::NextPage).await;
        assert_eq!(page_index_of(&out), Some(1));
    }

    #[tokio::test]
    async fn reset_on_review_reopens_the_page() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        enter(&ctx, &mut rx, ModeChoice::Learning).await;
        send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        for _ in 0..3 {
            answer(&ctx, &mut rx, 1).await;
        }
        assert!(ctx
            .session
            .lock()
            .await
            .learning_mut()
            .unwrap()
            .progression()
            .is_completed(0));

        send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        let out = send(&ctx, &mut rx, ClientMessage::ResetQuiz).await;
        assert_eq!(out[0], ServerMessage::QuizReset { page_index: 0 });
        assert!(matches!(
            &out[1],
            ServerMessage::PageReopened { completed_pages, .. } if completed_pages.is_empty()
        ));

        let out = send(&ctx, &mut rx, ClientMessage::NextPage).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::NavigationRejected { .. }]
        ));
    }

    #[tokio::test]
    async fn a_second_quiz_request_while_loading_is_refused() {
        let provider = Arc::new(FixedQuiz {
            outcome: QuizOutcome::Questions(four_questions()),
            latency: Duration::from_millis(20),
        });
        let (ctx, mut rx) = harness(test_config(), provider);
        enter(&ctx, &mut rx, ModeChoice::Learning).await;

        handle_client_message(&ctx, ClientMessage::StartQuiz).await;
        handle_client_message(&ctx, ClientMessage::StartQuiz).await;
        let out = drain(&mut rx).await;

        assert_eq!(out[0], ServerMessage::QuizLoading { page_index: 0 });
        assert_eq!(out[1], ServerMessage::error(SessionError::QuizBusy));
        let started = out
            .iter()
            .filter(|m| matches!(m, ServerMessage::QuizStarted { .. }))
            .count();
        assert_eq!(started, 1);
    }

    #[tokio::test]
    async fn not_quizable_with_auto_advance_stops_on_last_page() {
        let mut config = test_config();
        config.quiz_auto_advance = true;
        let provider = Arc::new(FixedQuiz {
            outcome: QuizOutcome::NotQuizable,
            latency: Duration::ZERO,
        });
        let (ctx, mut rx) = harness(config, provider);
        enter(&ctx, &mut rx, ModeChoice::Learning).await;

        for expected in 1..12 {
            let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
            assert_eq!(page_index_of(&out), Some(expected));
        }
        let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        assert!(out.contains(&ServerMessage::NotQuizable { page_index: 11 }));
        assert_eq!(page_index_of(&out), None);

        let mut session = ctx.session.lock().await;
        let learning = session.learning_mut().unwrap();
        assert_eq!(learning.current_page_index(), 11);
        assert!(learning.progression().is_completed(11));
        assert!((learning.progression().progress() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn not_quizable_without_auto_advance_unlocks_next() {
        let provider = Arc::new(FixedQuiz {
            outcome: QuizOutcome::NotQuizable,
            latency: Duration::ZERO,
        });
        let (ctx, mut rx) = harness(test_config(), provider);
        enter(&ctx, &mut rx, ModeChoice::Learning).await;

        let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        assert!(out.contains(&ServerMessage::NotQuizable { page_index: 0 }));
        assert_eq!(page_index_of(&out), None);

        let out = send(&ctx, &mut rx, ClientMessage::NextPage).await;
        assert_eq!(page_index_of(&out), Some(1));
    }

    #[tokio::test]
    async fn provider_failure_reports_quiz_unavailable() {
        let (ctx, mut rx) = harness(test_config(), Arc::new(FailingQuiz));
        enter(&ctx, &mut rx, ModeChoice::Learning).await;

        let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        assert!(matches!(
            out.last(),
            Some(ServerMessage::QuizUnavailable { .. })
        ));
        // The slot is released so the learner can retry.
        let out = send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        assert_eq!(out[0], ServerMessage::QuizLoading { page_index: 0 });
    }

    #[tokio::test]
    async fn unfinished_page_prompts_the_quiz() {
        let mut config = test_config();
        config.quiz_prompt_delay = Duration::ZERO;
        let (ctx, mut rx) = harness(config, questions_provider());
        let out = enter(&ctx, &mut rx, ModeChoice::Learning).await;
        assert!(out.contains(&ServerMessage::QuizPrompt { page_index: 0 }));
    }

    #[tokio::test]
    async fn restarting_during_the_pass_delay_keeps_the_pass() {
        let mut config = test_config();
        config.quiz_pass_delay = Duration::from_millis(100);
        let (ctx, mut rx) = harness(config, questions_provider());
        enter(&ctx, &mut rx, ModeChoice::Learning).await;
        send(&ctx, &mut rx, ClientMessage::StartQuiz).await;
        answer(&ctx, &mut rx, 1).await;
        answer(&ctx, &mut rx, 1).await;

        handle_client_message(&ctx, ClientMessage::SelectAnswer { option: 1 }).await;
        handle_client_message(&ctx, ClientMessage::SubmitAnswer).await;
        handle_client_message(&ctx, ClientMessage::StartQuiz).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let out = drain(&mut rx).await;

        assert!(out.contains(&ServerMessage::error(SessionError::PassPending)));
        assert!(!out
            .iter()
            .any(|m| matches!(m, ServerMessage::QuizStarted { .. })));
        assert!(out
            .iter()
            .any(|m| matches!(m, ServerMessage::PageCompleted { page_index: 0, .. })));
        let mut session = ctx.session.lock().await;
        assert!(session
            .learning_mut()
            .unwrap()
            .progression()
            .is_completed(0));
    }

    #[tokio::test]
    async fn leaving_a_page_frees_the_quiz_request_for_the_next_page() {
        let provider = Arc::new(FixedQuiz {
            outcome: QuizOutcome::Questions(four_questions()),
            latency: Duration::from_millis(200),
        });
        let (ctx, mut rx) = harness(test_config(), provider);
        enter(&ctx, &mut rx, ModeChoice::Learning).await;
        ctx.session
            .lock()
            .await
            .learning_mut()
            .unwrap()
            .mark_not_quizable(0, true);

        handle_client_message(&ctx, ClientMessage::StartQuiz).await;
        handle_client_message(&ctx, ClientMessage::PreviousPage).await;
        handle_client_message(&ctx, ClientMessage::StartQuiz).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        let out = drain(&mut rx).await;

        assert!(out.contains(&ServerMessage::QuizLoading { page_index: 1 }));
        assert!(out.contains(&ServerMessage::QuizLoading { page_index: 0 }));
        assert!(!out.iter().any(|m| matches!(m, ServerMessage::Error { .. })));
        let started: Vec<usize> = out
            .iter()
            .filter_map(|m| match m {
                ServerMessage::QuizStarted { page_index, .. } => Some(*page_index),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![0]);
    }

    //--- Free Reading Mode ---

    #[tokio::test]
    async fn free_reading_greets_and_navigates_freely() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = enter(&ctx, &mut rx, ModeChoice::FreeReading).await;
        assert!(out.iter().any(|m| matches!(
            m,
            ServerMessage::ChatMessage { message } if message.sender == "ai"
        )));
        assert_eq!(page_index_of(&out), Some(0));

        let out = send(&ctx, &mut rx, ClientMessage::JumpToPage { page_index: 9 }).await;
        assert_eq!(page_index_of(&out), Some(9));
        let out = send(&ctx, &mut rx, ClientMessage::JumpToPage { page_index: 12 }).await;
        assert!(matches!(
            out.as_slice(),
            [ServerMessage::NavigationRejected { .. }]
        ));
    }

    #[tokio::test]
    async fn chat_gets_a_reply_about_the_current_page() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        enter(&ctx, &mut rx, ModeChoice::FreeReading).await;
        send(&ctx, &mut rx, ClientMessage::NextPage).await;

        let out = send(
            &ctx,
            &mut rx,
            ClientMessage::SendChat {
                text: "What is this about?".to_string(),
            },
        )
        .await;
        let texts: Vec<(&str, &str)> = out
            .iter()
            .filter_map(|m| match m {
                ServerMessage::ChatMessage { message } => {
                    Some((message.sender, message.text.as_str()))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![("user", "What is this about?"), ("ai", "About page 2")]
        );

        let out = send(
            &ctx,
            &mut rx,
            ClientMessage::SendChat {
                text: "   ".to_string(),
            },
        )
        .await;
        assert!(matches!(out.as_slice(), [ServerMessage::Error { .. }]));
    }

    #[tokio::test]
    async fn back_to_home_cancels_pending_replies() {
        let mut config = test_config();
        config.chat_reply_delay = Duration::from_millis(100);
        let (ctx, mut rx) = harness(config, questions_provider());
        enter(&ctx, &mut rx, ModeChoice::FreeReading).await;

        handle_client_message(
            &ctx,
            ClientMessage::SendChat {
                text: "hello".to_string(),
            },
        )
        .await;
        handle_client_message(&ctx, ClientMessage::BackToHome).await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        let out = drain(&mut rx).await;

        assert!(out.contains(&ServerMessage::ModeChanged {
            mode: "upload".to_string()
        }));
        assert!(!out.iter().any(|m| matches!(
            m,
            ServerMessage::ChatMessage { message } if message.sender == "ai"
        )));
        let session = ctx.session.lock().await;
        assert!(session.study.is_none());
        assert!(session.controller.document().is_none());
    }

    #[tokio::test]
    async fn back_to_home_from_upload_is_an_error() {
        let (ctx, mut rx) = harness(test_config(), questions_provider());
        let out = send(&ctx, &mut rx, ClientMessage::BackToHome).await;
        assert!(matches!(out.as_slice(), [ServerMessage::Error { .. }]));
    }
}
