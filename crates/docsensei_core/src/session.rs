//! crates/docsensei_core/src/session.rs
//!
//! Session-scoped state for the two study modes. A session object is created
//! when a mode is entered and dropped on the way back home, which takes the
//! completed pages, quiz progress and transcript with it.

use std::sync::Arc;

use crate::chat::{ChatError, ChatTranscript};
use crate::domain::{ChatMessage, Document, Page, QuizQuestion};
use crate::progression::{JumpPolicy, LearningProgression, NavigationRejection};
use crate::quiz::{QuizEngine, QuizError, Reveal};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Navigation(#[from] NavigationRejection),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("no quiz is open for this page")]
    NoActiveQuiz,
    #[error("a quiz is already being prepared")]
    QuizBusy,
    #[error("the quiz was just passed, the page is being marked complete")]
    PassPending,
}

//=========================================================================================
// Learning Mode
//=========================================================================================

/// A quiz attached to the page it was opened on.
#[derive(Debug, Clone)]
pub struct ActiveQuiz {
    pub page_index: usize,
    pub attempt: u64,
    pub engine: QuizEngine,
}

/// What happened when the provider said a page cannot be quizzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotQuizableOutcome {
    pub page_index: usize,
    pub newly_completed: bool,
    pub advanced_to: Option<usize>,
}

#[derive(Debug)]
pub struct LearningSession {
    document: Arc<Document>,
    progression: LearningProgression,
    quiz: Option<ActiveQuiz>,
    attempt: u64,
    /// Id of the outstanding quiz fetch for the current page.
    quiz_fetch: Option<u64>,
    fetch_seq: u64,
}

impl LearningSession {
    pub fn new(document: Arc<Document>, policy: JumpPolicy) -> Self {
        let progression = LearningProgression::new(document.total_pages(), policy);
        Self {
            document,
            progression,
            quiz: None,
            attempt: 0,
            quiz_fetch: None,
            fetch_seq: 0,
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn progression(&self) -> &LearningProgression {
        &self.progression
    }

    pub fn current_page_index(&self) -> usize {
        self.progression.current_page_index()
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.document.page(self.current_page_index())
    }

    pub fn quiz(&self) -> Option<&ActiveQuiz> {
        self.quiz.as_ref()
    }

    /// The current attempt id; bumped by every quiz start and reset.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// True when the reader is on an unfinished page with no quiz open.
    pub fn needs_quiz_prompt(&self) -> bool {
        self.quiz.is_none() && !self.progression.is_completed(self.current_page_index())
    }

    pub fn next_page(&mut self) -> Result<usize, SessionError> {
        let before = self.current_page_index();
        let idx = self.progression.advance()?;
        if idx != before {
            self.leave_page();
        }
        Ok(idx)
    }

    pub fn previous_page(&mut self) -> usize {
        let before = self.current_page_index();
        let idx = self.progression.retreat();
        if idx != before {
            self.leave_page();
        }
        idx
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize, SessionError> {
        let before = self.current_page_index();
        let idx = self.progression.jump_to(index)?;
        if idx != before {
            self.leave_page();
        }
        Ok(idx)
    }

    /// Claims the quiz-fetch slot for the current page and returns the fetch id.
    ///
    /// Fails while a fetch for this page is outstanding, or while a passed quiz
    /// is waiting for its confirmation.
    pub fn begin_quiz_fetch(&mut self) -> Result<u64, SessionError> {
        if self.pass_pending() {
            return Err(SessionError::PassPending);
        }
        if self.quiz_fetch.is_some() {
            return Err(SessionError::QuizBusy);
        }
        self.fetch_seq += 1;
        self.quiz_fetch = Some(self.fetch_seq);
        Ok(self.fetch_seq)
    }

    /// Releases the slot. Returns `false` if `fetch` was superseded, either by
    /// a page change or by a newer fetch.
    pub fn finish_quiz_fetch(&mut self, fetch: u64) -> bool {
        if self.quiz_fetch == Some(fetch) {
            self.quiz_fetch = None;
            true
        } else {
            false
        }
    }

    pub fn quiz_fetch_pending(&self) -> bool {
        self.quiz_fetch.is_some()
    }

    /// True between reaching the pass threshold and the delayed confirmation.
    pub fn pass_pending(&self) -> bool {
        self.quiz.as_ref().is_some_and(|q| q.engine.is_passed())
    }

    /// Opens a quiz for the current page with the given questions.
    pub fn start_quiz(&mut self, questions: Vec<QuizQuestion>) -> Result<&ActiveQuiz, SessionError> {
        if self.pass_pending() {
            return Err(SessionError::PassPending);
        }
        let engine = QuizEngine::new(questions)?;
        self.attempt += 1;
        let quiz = self.quiz.insert(ActiveQuiz {
            page_index: self.progression.current_page_index(),
            attempt: self.attempt,
            engine,
        });
        Ok(quiz)
    }

    pub fn select_answer(&mut self, option: usize) -> Result<(), SessionError> {
        Ok(self.active_quiz_mut()?.engine.select(option)?)
    }

    pub fn submit_answer(&mut self) -> Result<Reveal, SessionError> {
        Ok(self.active_quiz_mut()?.engine.submit()?)
    }

    pub fn next_question(&mut self) -> Result<usize, SessionError> {
        Ok(self.active_quiz_mut()?.engine.next_question()?)
    }

    /// Restarts the open quiz and reopens its page. Returns the page index.
    pub fn reset_quiz(&mut self) -> Result<usize, SessionError> {
        let attempt = self.attempt + 1;
        let quiz = self.active_quiz_mut()?;
        quiz.engine.reset();
        quiz.attempt = attempt;
        let page_index = quiz.page_index;
        self.attempt = attempt;
        self.progression.mark_incomplete(page_index);
        Ok(page_index)
    }

    /// Applies a delayed pass signal. Ignored if the attempt was reset or
    /// replaced in the meantime. Returns `true` if the signal was applied.
    pub fn confirm_quiz_passed(&mut self, page_index: usize, attempt: u64) -> bool {
        if attempt != self.attempt {
            return false;
        }
        self.progression.mark_complete(page_index);
        if self
            .quiz
            .as_ref()
            .is_some_and(|q| q.page_index == page_index && q.engine.is_passed())
        {
            self.quiz = None;
        }
        true
    }

    /// Handles a page the provider cannot quiz: it counts as completed, and
    /// with `auto_advance` the reader moves on (clamped at the last page).
    pub fn mark_not_quizable(&mut self, page_index: usize, auto_advance: bool) -> NotQuizableOutcome {
        let mut outcome = NotQuizableOutcome {
            page_index,
            newly_completed: self.progression.mark_complete(page_index),
            advanced_to: None,
        };
        if auto_advance && page_index == self.current_page_index() {
            if let Ok(idx) = self.next_page() {
                outcome.advanced_to = Some(idx);
            }
        }
        outcome
    }

    fn leave_page(&mut self) {
        self.quiz = None;
        self.quiz_fetch = None;
    }

    fn active_quiz_mut(&mut self) -> Result<&mut ActiveQuiz, SessionError> {
        self.quiz.as_mut().ok_or(SessionError::NoActiveQuiz)
    }
}

//=========================================================================================
// Free Reading Mode
//=========================================================================================

#[derive(Debug)]
pub struct ReadingSession {
    document: Arc<Document>,
    current_page_index: usize,
    transcript: ChatTranscript,
}

impl ReadingSession {
    pub fn new(document: Arc<Document>) -> Self {
        Self {
            document,
            current_page_index: 0,
            transcript: ChatTranscript::with_welcome(),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.document.page(self.current_page_index)
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    pub fn next_page(&mut self) -> usize {
        let last = self.document.total_pages().saturating_sub(1);
        self.current_page_index = (self.current_page_index + 1).min(last);
        self.current_page_index
    }

    pub fn previous_page(&mut self) -> usize {
        self.current_page_index = self.current_page_index.saturating_sub(1);
        self.current_page_index
    }

    /// Free reading has no gating: any existing page is reachable.
    pub fn jump_to(&mut self, index: usize) -> Result<usize, SessionError> {
        if index >= self.document.total_pages() {
            return Err(NavigationRejection::OutOfRange(index).into());
        }
        self.current_page_index = index;
        Ok(index)
    }

    /// Fraction of the document read so far, counting the page on screen.
    pub fn progress(&self) -> f64 {
        let total = self.document.total_pages().max(1);
        (self.current_page_index + 1) as f64 / total as f64
    }

    pub fn post_user_message(&mut self, text: &str) -> Result<ChatMessage, SessionError> {
        Ok(self.transcript.push_user(text)?.clone())
    }

    pub fn post_ai_message(&mut self, text: impl Into<String>) -> ChatMessage {
        self.transcript.push_ai(text).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sender;
    use crate::intake::{build_document, UploadedFile, PDF_MEDIA_TYPE};
    use crate::quiz::QuizPhase;

    fn document() -> Arc<Document> {
        Arc::new(build_document(&UploadedFile::new("book.pdf", PDF_MEDIA_TYPE)).unwrap())
    }

    fn questions() -> Vec<QuizQuestion> {
        (0..4)
            .map(|i| {
                QuizQuestion::new(
                    format!("q{i}"),
                    "?",
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    1,
                    None,
                )
                .unwrap()
            })
            .collect()
    }

    fn pass(session: &mut LearningSession) -> Reveal {
        let mut last = None;
        for i in 0..3 {
            if i > 0 {
                session.next_question().unwrap();
            }
            session.select_answer(1).unwrap();
            last = Some(session.submit_answer().unwrap());
        }
        last.unwrap()
    }

    #[test]
    fn passing_and_confirming_unlocks_next_page() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        assert!(s.needs_quiz_prompt());
        assert!(s.next_page().is_err());

        s.start_quiz(questions()).unwrap();
        let reveal = pass(&mut s);
        assert!(reveal.passed);
        assert_eq!(s.quiz().unwrap().engine.phase(), QuizPhase::Passed);

        let attempt = s.attempt();
        assert!(s.confirm_quiz_passed(0, attempt));
        assert!(s.quiz().is_none());
        assert_eq!(s.next_page(), Ok(1));
    }

    #[test]
    fn reset_reopens_page_and_voids_pending_pass() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        s.start_quiz(questions()).unwrap();
        pass(&mut s);
        let stale = s.attempt();

        assert_eq!(s.reset_quiz(), Ok(0));
        assert!(!s.confirm_quiz_passed(0, stale));
        assert!(!s.progression().is_completed(0));
        assert_eq!(s.quiz().unwrap().engine.correct_count(), 0);
    }

    #[test]
    fn reset_on_review_reopens_completed_page() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        s.start_quiz(questions()).unwrap();
        pass(&mut s);
        let attempt = s.attempt();
        s.confirm_quiz_passed(0, attempt);
        assert!(s.progression().is_completed(0));

        s.start_quiz(questions()).unwrap();
        s.reset_quiz().unwrap();
        assert!(!s.progression().is_completed(0));
    }

    #[test]
    fn quiz_fetch_is_guarded() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        let fetch = s.begin_quiz_fetch().unwrap();
        assert_eq!(s.begin_quiz_fetch(), Err(SessionError::QuizBusy));
        assert!(s.finish_quiz_fetch(fetch));
        assert!(s.begin_quiz_fetch().is_ok());
    }

    #[test]
    fn leaving_a_page_releases_its_quiz_fetch() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        s.mark_not_quizable(0, true);
        let stale = s.begin_quiz_fetch().unwrap();

        assert_eq!(s.previous_page(), 0);
        assert!(!s.quiz_fetch_pending());
        let fresh = s.begin_quiz_fetch().unwrap();
        assert!(!s.finish_quiz_fetch(stale));
        assert!(s.finish_quiz_fetch(fresh));
    }

    #[test]
    fn passed_quiz_cannot_be_restarted_before_confirmation() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        s.start_quiz(questions()).unwrap();
        pass(&mut s);
        let attempt = s.attempt();

        assert_eq!(s.begin_quiz_fetch(), Err(SessionError::PassPending));
        assert!(matches!(
            s.start_quiz(questions()),
            Err(SessionError::PassPending)
        ));
        assert!(s.confirm_quiz_passed(0, attempt));
        assert!(s.progression().is_completed(0));
        assert!(s.begin_quiz_fetch().is_ok());
    }

    #[test]
    fn quiz_actions_need_an_open_quiz() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        assert_eq!(s.submit_answer(), Err(SessionError::NoActiveQuiz));
        assert_eq!(s.reset_quiz(), Err(SessionError::NoActiveQuiz));
    }

    #[test]
    fn leaving_a_page_closes_its_quiz() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        s.start_quiz(questions()).unwrap();
        pass(&mut s);
        let attempt = s.attempt();
        s.confirm_quiz_passed(0, attempt);
        s.next_page().unwrap();
        s.start_quiz(questions()).unwrap();

        assert_eq!(s.previous_page(), 0);
        assert!(s.quiz().is_none());
    }

    #[test]
    fn not_quizable_on_last_page_completes_without_moving() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        for idx in 0..11 {
            assert!(s.mark_not_quizable(idx, true).newly_completed);
        }
        assert_eq!(s.current_page_index(), 11);

        let outcome = s.mark_not_quizable(11, true);
        assert!(outcome.newly_completed);
        assert_eq!(outcome.advanced_to, Some(11));
        assert_eq!(s.current_page_index(), 11);
        assert!(s.progression().is_completed(11));
        assert!((s.progression().progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn not_quizable_without_auto_advance_stays_on_page() {
        let mut s = LearningSession::new(document(), JumpPolicy::default());
        let outcome = s.mark_not_quizable(0, false);
        assert!(outcome.newly_completed);
        assert_eq!(outcome.advanced_to, None);
        assert_eq!(s.current_page_index(), 0);
        assert_eq!(s.next_page(), Ok(1));
    }

    #[test]
    fn reading_session_navigates_freely() {
        let mut r = ReadingSession::new(document());
        assert_eq!(r.previous_page(), 0);
        assert_eq!(r.jump_to(7), Ok(7));
        assert!(r.jump_to(12).is_err());
        for _ in 0..10 {
            r.next_page();
        }
        assert_eq!(r.current_page_index(), 11);
        assert!((r.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reading_session_transcript_grows() {
        let mut r = ReadingSession::new(document());
        assert_eq!(r.transcript().len(), 1);
        let user = r.post_user_message("why?").unwrap();
        assert_eq!(user.sender, Sender::User);
        r.post_ai_message("because");
        assert_eq!(r.transcript().len(), 3);
        assert!(r.post_user_message("").is_err());
        assert_eq!(r.transcript().len(), 3);
    }
}
