//! crates/docsensei_core/src/quiz.rs
//!
//! One quiz attempt over a fixed question sequence. Questions wrap around so
//! the learner keeps going until enough answers are correct.

use std::collections::BTreeSet;

use crate::domain::{QuestionError, QuizQuestion};

/// Cumulative correct answers needed to pass a page.
pub const PASS_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Answering { question: usize },
    Revealed { question: usize, correct: bool },
    Passed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("a quiz needs at least one question")]
    NoQuestions,
    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
    #[error("select an answer before submitting")]
    NoSelection,
    #[error("option {option} does not exist (question has {len} options)")]
    InvalidOption { option: usize, len: usize },
    #[error("the answer has already been revealed")]
    AlreadyRevealed,
    #[error("submit an answer before moving on")]
    NotRevealed,
    #[error("the quiz has already been passed")]
    AlreadyPassed,
}

/// The result of submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    pub question: usize,
    pub selected: usize,
    pub correct: bool,
    pub correct_answer: usize,
    pub correct_count: u32,
    /// True only on the submission that reached the threshold.
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct QuizEngine {
    questions: Vec<QuizQuestion>,
    phase: QuizPhase,
    selected: Option<usize>,
    correct_count: u32,
    answered: BTreeSet<usize>,
}

impl QuizEngine {
    pub fn new(questions: Vec<QuizQuestion>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        for q in &questions {
            q.validate()?;
        }
        Ok(Self {
            questions,
            phase: QuizPhase::Answering { question: 0 },
            selected: None,
            correct_count: 0,
            answered: BTreeSet::new(),
        })
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn is_passed(&self) -> bool {
        self.phase == QuizPhase::Passed
    }

    /// Questions that have been revealed at least once in this attempt.
    pub fn answered(&self) -> &BTreeSet<usize> {
        &self.answered
    }

    pub fn current_question(&self) -> Option<(usize, &QuizQuestion)> {
        match self.phase {
            QuizPhase::Answering { question } | QuizPhase::Revealed { question, .. } => {
                Some((question, &self.questions[question]))
            }
            QuizPhase::Passed => None,
        }
    }

    pub fn select(&mut self, option: usize) -> Result<(), QuizError> {
        let question = match self.phase {
            QuizPhase::Answering { question } => question,
            QuizPhase::Revealed { .. } => return Err(QuizError::AlreadyRevealed),
            QuizPhase::Passed => return Err(QuizError::AlreadyPassed),
        };
        let len = self.questions[question].options.len();
        if option >= len {
            return Err(QuizError::InvalidOption { option, len });
        }
        self.selected = Some(option);
        Ok(())
    }

    pub fn submit(&mut self) -> Result<Reveal, QuizError> {
        let question = match self.phase {
            QuizPhase::Answering { question } => question,
            QuizPhase::Revealed { .. } => return Err(QuizError::AlreadyRevealed),
            QuizPhase::Passed => return Err(QuizError::AlreadyPassed),
        };
        let selected = self.selected.ok_or(QuizError::NoSelection)?;
        let q = &self.questions[question];
        let correct = q.is_correct(selected);

        self.answered.insert(question);
        if correct {
            self.correct_count += 1;
        }
        let passed = self.correct_count >= PASS_THRESHOLD;
        self.phase = if passed {
            QuizPhase::Passed
        } else {
            QuizPhase::Revealed { question, correct }
        };

        Ok(Reveal {
            question,
            selected,
            correct,
            correct_answer: q.correct_answer,
            correct_count: self.correct_count,
            passed,
        })
    }

    /// Moves from a revealed answer to the next question, wrapping at the end.
    pub fn next_question(&mut self) -> Result<usize, QuizError> {
        match self.phase {
            QuizPhase::Revealed { question, .. } => {
                let next = (question + 1) % self.questions.len();
                self.phase = QuizPhase::Answering { question: next };
                self.selected = None;
                Ok(next)
            }
            QuizPhase::Answering { .. } => Err(QuizError::NotRevealed),
            QuizPhase::Passed => Err(QuizError::AlreadyPassed),
        }
    }

    pub fn reset(&mut self) {
        self.phase = QuizPhase::Answering { question: 0 };
        self.selected = None;
        self.correct_count = 0;
        self.answered.clear();
    }
}
