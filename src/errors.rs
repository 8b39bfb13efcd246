use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use tracing::{error, info, warn};

/// Message surfaced to callers whenever the upstream service throttles us.
pub const RATE_LIMIT_MESSAGE: &str = "API rate limit exceeded. Please try again later.";

/// Failures raised while talking to the external generative service.
///
/// Providers build these at the point of failure, so a throttled call is
/// already tagged `RateLimited` before it ever reaches the classifier.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("empty response from generative service")]
    EmptyResponse,

    #[error("operation not supported by {0}")]
    Unsupported(&'static str),

    #[error("{0}")]
    Other(String),
}

// Request URLs can carry credentials, so they are dropped before the error is
// formatted into logs or response bodies.
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.without_url())
    }
}

/// Typed failures of the generation client.
///
/// `RateLimited` and `TokenLimitExceeded` are narrowings of `Generic` that the
/// HTTP layer reports with their own status codes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Generic(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Input token count {token_count} exceeds the limit of {limit} tokens")]
    TokenLimitExceeded { token_count: u32, limit: u32 },
}

impl GenerationError {
    pub fn generic(message: impl Into<String>) -> Self {
        GenerationError::Generic(message.into())
    }

    /// Stable tag used in logs and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Generic(_) => "generic",
            GenerationError::RateLimited(_) => "rate_limited",
            GenerationError::TokenLimitExceeded { .. } => "token_limit_exceeded",
        }
    }

    /// Prefix a generic failure with the operation that produced it.
    /// Narrower kinds already carry their own message and pass through untouched.
    pub fn in_operation(self, operation: &str) -> Self {
        match self {
            GenerationError::Generic(message) => {
                GenerationError::Generic(format!("Failed to {}: {}", operation, message))
            }
            other => other,
        }
    }
}

/// Map an upstream failure onto the typed error taxonomy.
///
/// The substring check catches providers (and stubs) that only report
/// throttling in their message text.
pub fn classify_service_error(operation: &str, err: &ServiceError) -> GenerationError {
    if let ServiceError::RateLimited(_) = err {
        return GenerationError::RateLimited(RATE_LIMIT_MESSAGE.to_string());
    }

    if err.to_string().to_lowercase().contains("rate limit") {
        return GenerationError::RateLimited(RATE_LIMIT_MESSAGE.to_string());
    }

    GenerationError::Generic(format!("Failed to {}: {}", operation, err))
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            error_type: None,
        }
    }

    pub fn with_type(mut self, error_type: &str) -> Self {
        self.error_type = Some(error_type.to_string());
        self
    }
}

/// Errors as seen by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_type: resource_type.to_string(),
        }
    }
}

pub type ErrorResponse = (StatusCode, Json<ErrorBody>);

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(self, context: ErrorContext) -> ErrorResponse {
        match &self {
            ApiError::ValidationError(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Validation error"
                );
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(self.to_string())))
            }
            ApiError::Generation(GenerationError::TokenLimitExceeded { token_count, limit }) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    token_count = *token_count,
                    limit = *limit,
                    "Token limit exceeded"
                );
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    Json(ErrorBody::new(self.to_string()).with_type("token_limit_exceeded")),
                )
            }
            ApiError::Generation(GenerationError::RateLimited(_)) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Rate limited by generative service"
                );
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorBody::new(self.to_string())),
                )
            }
            ApiError::Generation(GenerationError::Generic(_)) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    error = %self,
                    "Generation failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(self.to_string())),
                )
            }
        }
    }

    pub fn to_response(self) -> ErrorResponse {
        self.to_response_with_context(ErrorContext::new("unknown", "request"))
    }
}
