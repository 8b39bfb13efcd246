use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::{get, post},
};
use serde::de::DeserializeOwned;

use crate::{
    errors::{ApiError, ErrorContext, ErrorResponse},
    llm_service::LLMService,
    models::*,
    prompts::DEFAULT_FLASHCARD_COUNT,
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub llm_service: LLMService,
}

impl AppState {
    pub fn new(llm_service: LLMService) -> Self {
        Self { llm_service }
    }
}

/// Unwrap a JSON body. A missing or non-JSON body is treated like an empty one
/// so the caller still gets the missing-fields message; well-formed JSON with
/// mistyped fields is rejected with the deserializer's explanation.
fn payload_or_default<T: DeserializeOwned + Default>(
    payload: Result<Json<T>, JsonRejection>,
    operation: &str,
) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::JsonDataError(e)) => Err(ApiError::ValidationError(format!(
            "Invalid request body: {}",
            e.body_text()
        ))),
        Err(rejection) => {
            log_api_warn!(operation, rejection.body_text());
            Ok(T::default())
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_flashcards_payload(payload: FlashcardsPayload) -> Result<GenerationRequest, ApiError> {
    let (Some(topic), Some(level)) = (present(payload.topic), present(payload.level)) else {
        return Err(ApiError::ValidationError(
            "Missing required fields: topic and level".to_string(),
        ));
    };

    let count = match payload.count {
        None => DEFAULT_FLASHCARD_COUNT,
        Some(count) => count
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .filter(|count| *count > 0)
            .ok_or_else(|| {
                ApiError::ValidationError("count must be a positive integer".to_string())
            })?,
    };

    Ok(GenerationRequest { topic, level, count })
}

fn validate_evaluate_payload(payload: EvaluatePayload) -> Result<EvaluationRequest, ApiError> {
    match (present(payload.question), present(payload.answer)) {
        (Some(question), Some(answer)) => Ok(EvaluationRequest { question, answer }),
        _ => Err(ApiError::ValidationError(
            "Missing required fields: question and answer".to_string(),
        )),
    }
}

pub async fn generate_flashcards(
    State(state): State<AppState>,
    payload: Result<Json<FlashcardsPayload>, JsonRejection>,
) -> Result<Json<FlashcardsResponse>, ErrorResponse> {
    const OPERATION: &str = "generate_flashcards";
    let context = || ErrorContext::new(OPERATION, "flashcards");

    let request = payload_or_default(payload, OPERATION)
        .and_then(validate_flashcards_payload)
        .map_err(|e| e.to_response_with_context(context()))?;

    log_api_start!(OPERATION, topic = request.topic);

    match state
        .llm_service
        .generate_flashcards(&request.topic, &request.level, request.count)
        .await
    {
        Ok(questions) => {
            log_api_success!(OPERATION, count = questions.len(), "flashcards generated");
            Ok(Json(FlashcardsResponse { questions }))
        }
        Err(e) => {
            log_api_error!(OPERATION, error = e, "generation failed");
            Err(ApiError::from(e).to_response_with_context(context()))
        }
    }
}

pub async fn evaluate_answer(
    State(state): State<AppState>,
    payload: Result<Json<EvaluatePayload>, JsonRejection>,
) -> Result<Json<EvaluationResult>, ErrorResponse> {
    const OPERATION: &str = "evaluate_answer";
    let context = || ErrorContext::new(OPERATION, "evaluation");

    let request = payload_or_default(payload, OPERATION)
        .and_then(validate_evaluate_payload)
        .map_err(|e| e.to_response_with_context(context()))?;

    log_api_start!(OPERATION);

    match state
        .llm_service
        .evaluate_answer(&request.question, &request.answer)
        .await
    {
        Ok(result) => {
            log_api_success!(OPERATION, "answer evaluated");
            Ok(Json(result))
        }
        Err(e) => {
            log_api_error!(OPERATION, error = e, "evaluation failed");
            Err(ApiError::from(e).to_response_with_context(context()))
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.llm_service.provider_name().to_string(),
        model: state.llm_service.model_name().to_string(),
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/flashcards", post(generate_flashcards))
        .route("/api/evaluate", post(evaluate_answer))
        .route("/api/health", get(health))
        .with_state(state)
}
