use serde::{Deserialize, Serialize};

use crate::prompts::DEFAULT_FLASHCARD_COUNT;

/// A single study question plus whatever the learner has done with it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: Option<String>,
    pub rating: Option<f64>,
    pub feedback: Option<String>,
}

impl Flashcard {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: None,
            rating: None,
            feedback: None,
        }
    }

    /// Record the learner's answer together with its evaluation.
    pub fn answered(mut self, answer: impl Into<String>, evaluation: EvaluationResult) -> Self {
        self.answer = Some(answer.into());
        self.rating = Some(evaluation.rating);
        self.feedback = Some(evaluation.feedback);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub level: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    DEFAULT_FLASHCARD_COUNT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub question: String,
    pub answer: String,
}

/// Rating (nominally 0-5, not clamped) and feedback for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub rating: f64,
    pub feedback: String,
}

// Request/response bodies of the HTTP layer. Required fields are optional here
// so missing ones can be reported with a 400 rather than a rejection.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashcardsPayload {
    pub topic: Option<String>,
    pub level: Option<String>,
    /// Kept loose so a mistyped count gets its own validation message.
    pub count: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluatePayload {
    pub question: Option<String>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardsResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: String,
    pub model: String,
}
