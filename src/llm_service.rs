use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{GenerationError, classify_service_error};
use crate::extractor::{JsonResponseParser, ResponseExtractor};
use crate::llm_providers::{GenerativeModel, LLMProviderFactory, LLMProviderType};
use crate::models::EvaluationResult;
use crate::prompts::{build_evaluation_prompt, build_generation_prompt};

// Import logging macros
use crate::log_llm_operation;

/// Prompts at or above this many input tokens are refused before generation.
pub const DEFAULT_INPUT_TOKEN_LIMIT: u32 = 500;

const INVALID_RESPONSE_FORMAT: &str = "invalid response format";

/// Generation client: builds prompts, calls the generative service and turns
/// its reply into typed results. Holds only shared handles, so clones are cheap
/// and concurrent calls do not interfere.
#[derive(Clone)]
pub struct LLMService {
    model: Arc<dyn GenerativeModel>,
    extractor: Arc<dyn ResponseExtractor>,
    input_token_limit: u32,
    token_precheck: bool,
}

impl LLMService {
    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
    ) -> Result<Self, GenerationError> {
        let provider = LLMProviderFactory::create_provider(provider_type, api_key, base_url, model)?;
        Ok(Self::from_model(Arc::new(provider)))
    }

    pub fn new_gemini(api_key: String, model: Option<String>) -> Result<Self, GenerationError> {
        Self::new_with_provider(api_key, None, LLMProviderType::Gemini, model)
    }

    /// Wrap an already constructed model handle.
    pub fn from_model(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            extractor: Arc::new(JsonResponseParser),
            input_token_limit: DEFAULT_INPUT_TOKEN_LIMIT,
            token_precheck: true,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ResponseExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_input_token_limit(mut self, limit: u32) -> Self {
        self.input_token_limit = limit;
        self
    }

    pub fn with_token_precheck(mut self, enabled: bool) -> Self {
        self.token_precheck = enabled;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.model.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn input_token_limit(&self) -> u32 {
        self.input_token_limit
    }

    pub async fn generate_flashcards(
        &self,
        topic: &str,
        level: &str,
        count: u32,
    ) -> Result<Vec<String>, GenerationError> {
        const OPERATION: &str = "generate flashcards";

        info!(
            topic = %topic,
            level = %level,
            count = count,
            "Generating flashcards"
        );

        let prompt = build_generation_prompt(topic, level, count);
        let value = self.run(OPERATION, &prompt).await?;

        let questions = questions_from_value(value)
            .ok_or_else(|| GenerationError::generic(INVALID_RESPONSE_FORMAT).in_operation(OPERATION))?;

        info!(
            question_count = questions.len(),
            requested = count,
            "Successfully generated flashcards"
        );

        Ok(questions)
    }

    pub async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<EvaluationResult, GenerationError> {
        const OPERATION: &str = "evaluate answer";

        info!(
            question = %question.chars().take(100).collect::<String>(),
            answer_length = answer.len(),
            "Evaluating answer"
        );

        let prompt = build_evaluation_prompt(question, answer);
        let value = self.run(OPERATION, &prompt).await?;

        let result = evaluation_from_value(value)
            .ok_or_else(|| GenerationError::generic(INVALID_RESPONSE_FORMAT).in_operation(OPERATION))?;

        if !(0.0..=5.0).contains(&result.rating) {
            warn!(rating = result.rating, "Evaluation rating outside 0-5 range");
        }

        info!(
            rating = result.rating,
            feedback = %result.feedback.chars().take(100).collect::<String>(),
            "Successfully evaluated answer"
        );

        Ok(result)
    }

    /// Pre-check, generate and extract. Shared by both operations.
    async fn run(&self, operation: &str, prompt: &str) -> Result<Value, GenerationError> {
        let started = Instant::now();

        if self.token_precheck {
            self.check_token_budget(operation, prompt).await?;
        }

        let response_text = match self.model.generate_content(prompt).await {
            Ok(text) => text,
            Err(e) => {
                let classified = classify_service_error(operation, &e);
                log_llm_operation!(
                    error,
                    operation,
                    provider = self.provider_name(),
                    error = e,
                    kind = classified.kind()
                );
                return Err(classified);
            }
        };

        debug!(
            operation = operation,
            response_content = %response_text,
            "Raw LLM response"
        );

        let value = self
            .extractor
            .extract(&response_text)
            .map_err(|e| e.in_operation(operation))?;

        debug!(
            operation = operation,
            extracted_json = %value,
            "Extracted JSON from LLM response"
        );

        log_llm_operation!(
            success,
            operation,
            provider = self.provider_name(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(value)
    }

    /// Advisory only: when the count cannot be obtained the call proceeds.
    async fn check_token_budget(&self, operation: &str, prompt: &str) -> Result<(), GenerationError> {
        match self.model.count_tokens(prompt).await {
            Ok(token_count) if token_count >= self.input_token_limit => {
                warn!(
                    operation = operation,
                    token_count = token_count,
                    limit = self.input_token_limit,
                    "Prompt exceeds input token limit"
                );
                Err(GenerationError::TokenLimitExceeded {
                    token_count,
                    limit: self.input_token_limit,
                })
            }
            Ok(token_count) => {
                debug!(
                    operation = operation,
                    token_count = token_count,
                    limit = self.input_token_limit,
                    "Prompt within input token limit"
                );
                Ok(())
            }
            Err(e) => {
                log_llm_operation!(warn, operation, format!("token count unavailable, continuing: {}", e));
                Ok(())
            }
        }
    }
}

fn questions_from_value(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(question) => Some(question),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn evaluation_from_value(value: Value) -> Option<EvaluationResult> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}
