//! services/api/src/adapters/static_quiz.rs
//!
//! A `QuizProvider` that serves the same four questions for every page. Used
//! when no quiz provider URL is configured.

use async_trait::async_trait;
use docsensei_core::domain::QuizQuestion;
use docsensei_core::ports::{PortError, PortResult, QuizOutcome, QuizProvider, QuizRequest};

#[derive(Clone, Default)]
pub struct StaticQuizProvider;

impl StaticQuizProvider {
    pub fn new() -> Self {
        Self
    }
}

/// The built-in question set for page `page_number`.
pub fn question_bank(page_number: u32) -> PortResult<Vec<QuizQuestion>> {
    let entries: [(&str, [&str; 4], usize, &str); 4] = [
        (
            "Based on the content of page {page}, what is the primary learning objective being addressed?",
            [
                "Understanding fundamental concepts through interactive engagement",
                "Memorizing specific facts and figures",
                "Completing tasks as quickly as possible",
                "Following predetermined learning paths",
            ],
            0,
            "The content emphasizes deep understanding through interactive engagement rather than rote memorization.",
        ),
        (
            "Which learning strategy is most emphasized in this section?",
            [
                "Passive reading and note-taking",
                "Active participation and critical thinking",
                "Speed reading techniques",
                "Group discussion only",
            ],
            1,
            "Active participation and critical thinking are key to effective learning and retention.",
        ),
        (
            "What is the main benefit of the interactive approach described on this page?",
            [
                "Faster completion of coursework",
                "Enhanced comprehension and long-term retention",
                "Reduced study time requirements",
                "Simplified content presentation",
            ],
            1,
            "Interactive learning approaches significantly improve comprehension and help with long-term retention of knowledge.",
        ),
        (
            "According to the content, what should be the primary focus when learning new material?",
            [
                "Speed of completion",
                "Understanding underlying principles and connections",
                "Memorizing all details perfectly",
                "Following instructions exactly",
            ],
            1,
            "Understanding underlying principles and making connections between concepts leads to deeper, more meaningful learning.",
        ),
    ];

    entries
        .iter()
        .enumerate()
        .map(|(i, (question, options, correct, explanation))| {
            QuizQuestion::new(
                format!("q{}-page-{}", i + 1, page_number),
                question.replace("{page}", &page_number.to_string()),
                options.iter().map(|o| o.to_string()).collect(),
                *correct,
                Some(explanation.to_string()),
            )
            .map_err(|e| PortError::Unexpected(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl QuizProvider for StaticQuizProvider {
    async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<QuizOutcome> {
        Ok(QuizOutcome::Questions(question_bank(request.page_number)?))
    }
}
