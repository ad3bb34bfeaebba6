//! services/api/src/adapters/quiz_http.rs
//!
//! This module contains the adapter for the external quiz generation endpoint.
//! It implements the `QuizProvider` port from the `core` crate.

use async_trait::async_trait;
use docsensei_core::domain::QuizQuestion;
use docsensei_core::ports::{PortError, PortResult, QuizOutcome, QuizProvider, QuizRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const NOT_QUIZABLE_RESULT: &str = "Not a quizable page";
const NO_QUIZ_MESSAGE: &str = "No quiz available for this page.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizProvider` by calling `POST {base}/generate-quiz`.
#[derive(Clone)]
pub struct HttpQuizProvider {
    client: Client,
    endpoint: String,
}

impl HttpQuizProvider {
    /// Creates a new `HttpQuizProvider` for the provider at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/generate-quiz", base_url.trim_end_matches('/')),
        })
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQuizBody<'a> {
    page_content: &'a str,
    page_number: u32,
    document_id: Uuid,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderResponse {
    /// Entries are decoded one by one so a broken entry only drops itself.
    Questions { questions: Vec<serde_json::Value> },
    Result { result: String },
    Error { error: String },
}

/// Accepts both the indexed shape and the lettered `choices`/`answer` shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderQuestion {
    #[serde(rename_all = "camelCase")]
    Indexed {
        id: Option<String>,
        question: String,
        options: Vec<String>,
        correct_answer: usize,
        explanation: Option<String>,
    },
    Lettered {
        question: String,
        choices: BTreeMap<String, String>,
        answer: String,
        explanation: Option<String>,
    },
}

impl ProviderQuestion {
    fn to_domain(self, fallback_id: String) -> Option<QuizQuestion> {
        let built = match self {
            ProviderQuestion::Indexed {
                id,
                question,
                options,
                correct_answer,
                explanation,
            } => QuizQuestion::new(
                id.unwrap_or(fallback_id),
                question,
                options,
                correct_answer,
                explanation,
            ),
            ProviderQuestion::Lettered {
                question,
                choices,
                answer,
                explanation,
            } => {
                // BTreeMap keeps the labels in A, B, C, D order.
                let labels: Vec<String> = choices.keys().map(|k| k.trim().to_uppercase()).collect();
                let wanted = answer.trim().to_uppercase();
                let Some(correct) = labels.iter().position(|label| *label == wanted) else {
                    warn!("Dropping quiz question whose answer '{}' is not a choice", answer);
                    return None;
                };
                QuizQuestion::new(
                    fallback_id,
                    question,
                    choices.into_values().collect(),
                    correct,
                    explanation,
                )
            }
        };
        match built {
            Ok(q) => Some(q),
            Err(e) => {
                warn!("Dropping invalid quiz question from provider: {}", e);
                None
            }
        }
    }
}

/// Maps a provider payload onto the port's outcome.
///
/// Anything that is not a non-empty question list or the not-quizable marker
/// is reported as "no quiz available".
pub fn parse_quiz_response(body: serde_json::Value, page_number: u32) -> QuizOutcome {
    let response = match serde_json::from_value::<ProviderResponse>(body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Unrecognized quiz provider response: {}", e);
            return QuizOutcome::Unavailable(NO_QUIZ_MESSAGE.to_string());
        }
    };

    match response {
        ProviderResponse::Questions { questions } => {
            let questions: Vec<QuizQuestion> = questions
                .into_iter()
                .enumerate()
                .filter_map(|(i, raw)| match serde_json::from_value::<ProviderQuestion>(raw) {
                    Ok(q) => q.to_domain(format!("q{}-page-{}", i + 1, page_number)),
                    Err(e) => {
                        warn!("Dropping malformed quiz question {}: {}", i + 1, e);
                        None
                    }
                })
                .collect();
            if questions.is_empty() {
                QuizOutcome::Unavailable(NO_QUIZ_MESSAGE.to_string())
            } else {
                QuizOutcome::Questions(questions)
            }
        }
        ProviderResponse::Result { result } if result.trim() == NOT_QUIZABLE_RESULT => {
            QuizOutcome::NotQuizable
        }
        ProviderResponse::Result { result } => {
            warn!("Quiz provider returned unknown result '{}'", result);
            QuizOutcome::Unavailable(NO_QUIZ_MESSAGE.to_string())
        }
        ProviderResponse::Error { error } => {
            warn!("Quiz provider reported an error: {}", error);
            QuizOutcome::Unavailable(NO_QUIZ_MESSAGE.to_string())
        }
    }
}

//=========================================================================================
// `QuizProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizProvider for HttpQuizProvider {
    async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<QuizOutcome> {
        info!(
            "Requesting quiz for page {} of document {}",
            request.page_number, request.document_id
        );
        let body = GenerateQuizBody {
            page_content: &request.page_content,
            page_number: request.page_number,
            document_id: request.document_id,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!("Quiz provider answered with status {}", status);

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("invalid quiz response ({status}): {e}")))?;

        Ok(parse_quiz_response(payload, request.page_number))
    }
}
