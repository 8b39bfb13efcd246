use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::errors::{GenerationError, ServiceError};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const GEMINI_API_KEY_HEADER: &str = "x-goog-api-key";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// The external generative service as the generation client sees it.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Count the input tokens the service would charge for `prompt`.
    async fn count_tokens(&self, prompt: &str) -> Result<u32, ServiceError>;

    /// Run a single generation call and return the reply text.
    async fn generate_content(&self, prompt: &str) -> Result<String, ServiceError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Enum-based provider so the concrete backend is chosen from configuration.
#[derive(Debug, Clone)]
pub enum LLMProvider {
    Gemini(GeminiProvider),
    OpenAI(OpenAIProvider),
}

#[async_trait]
impl GenerativeModel for LLMProvider {
    async fn count_tokens(&self, prompt: &str) -> Result<u32, ServiceError> {
        match self {
            LLMProvider::Gemini(provider) => provider.count_tokens(prompt).await,
            LLMProvider::OpenAI(provider) => provider.count_tokens(prompt).await,
        }
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, ServiceError> {
        match self {
            LLMProvider::Gemini(provider) => provider.generate_content(prompt).await,
            LLMProvider::OpenAI(provider) => provider.generate_content(prompt).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::Gemini(provider) => provider.provider_name(),
            LLMProvider::OpenAI(provider) => provider.provider_name(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            LLMProvider::Gemini(provider) => provider.model_name(),
            LLMProvider::OpenAI(provider) => provider.model_name(),
        }
    }
}

/// Turn a non-success response into a typed failure.
async fn failed_response(provider: &'static str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    error!(
        provider = provider,
        status = %status,
        error = %body,
        "LLM API request failed"
    );

    if status == StatusCode::TOO_MANY_REQUESTS {
        ServiceError::RateLimited(body)
    } else {
        ServiceError::Http {
            status: status.as_u16(),
            body,
        }
    }
}

fn build_client(provider: &str) -> Result<Client, GenerationError> {
    Client::builder().build().map_err(|e| {
        GenerationError::generic(format!("Failed to initialize {} client: {}", provider, e))
    })
}

/// Gemini provider implementation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiTokenCount {
    #[serde(rename = "totalTokens")]
    total_tokens: u32,
}

impl GeminiRequest {
    fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::generic(
                "Failed to initialize Gemini client: missing API key",
            ));
        }

        Ok(Self {
            client: build_client("Gemini")?,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    fn post(&self, method: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint(method))
            .header(GEMINI_API_KEY_HEADER, &self.api_key)
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    async fn count_tokens(&self, prompt: &str) -> Result<u32, ServiceError> {
        let response = self
            .post("countTokens")
            .json(&GeminiRequest::from_prompt(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failed_response(self.provider_name(), response).await);
        }

        let count: GeminiTokenCount = response.json().await?;
        debug!(
            provider = self.provider_name(),
            total_tokens = count.total_tokens,
            "Counted prompt tokens"
        );
        Ok(count.total_tokens)
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, ServiceError> {
        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .post("generateContent")
            .json(&GeminiRequest::from_prompt(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failed_response(self.provider_name(), response).await);
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        info!(
            provider = self.provider_name(),
            response_length = text.len(),
            "Successfully received LLM response"
        );

        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// OpenAI-compatible chat completions provider.
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::generic(
                "Failed to initialize OpenAI client: missing API key",
            ));
        }

        Ok(Self {
            client: build_client("OpenAI")?,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl GenerativeModel for OpenAIProvider {
    async fn count_tokens(&self, _prompt: &str) -> Result<u32, ServiceError> {
        // The chat completions API has no counting endpoint.
        Err(ServiceError::Unsupported(self.provider_name()))
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, ServiceError> {
        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
        };

        info!(
            provider = self.provider_name(),
            model = %self.model,
            base_url = %self.base_url,
            prompt_length = prompt.len(),
            "Making LLM request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failed_response(self.provider_name(), response).await);
        }

        let openai_response: OpenAIResponse = response.json().await?;

        let text = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        info!(
            provider = self.provider_name(),
            response_length = text.len(),
            "Successfully received LLM response"
        );

        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    Gemini,
    OpenAI,
}

impl LLMProviderType {
    /// Parse a provider name from configuration. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(LLMProviderType::Gemini),
            "openai" | "chatgpt" | "gpt" => Some(LLMProviderType::OpenAI),
            _ => None,
        }
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<LLMProvider, GenerationError> {
        Ok(match provider_type {
            LLMProviderType::Gemini => {
                LLMProvider::Gemini(GeminiProvider::new(api_key, base_url, model)?)
            }
            LLMProviderType::OpenAI => {
                LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, model)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let gemini =
            LLMProviderFactory::create_provider(LLMProviderType::Gemini, "key".into(), None, None)
                .unwrap();
        assert_eq!(gemini.provider_name(), "Gemini");
        assert_eq!(gemini.model_name(), DEFAULT_GEMINI_MODEL);

        let openai = LLMProviderFactory::create_provider(
            LLMProviderType::OpenAI,
            "key".into(),
            None,
            Some("gpt-4o".into()),
        )
        .unwrap();
        assert_eq!(openai.provider_name(), "OpenAI");
        assert_eq!(openai.model_name(), "gpt-4o");
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let err = GeminiProvider::new("  ".to_string(), None, None).unwrap_err();
        assert!(matches!(err, GenerationError::Generic(ref m) if m.contains("missing API key")));
    }

    #[test]
    fn test_gemini_endpoint() {
        let provider = GeminiProvider::new(
            "abc".to_string(),
            Some("http://localhost:8080/v1beta/".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(
            provider.endpoint("countTokens"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:countTokens"
        );
    }

    #[test]
    fn test_provider_type_parsing() {
        let cases = [
            ("gemini", Some(LLMProviderType::Gemini)),
            ("Google", Some(LLMProviderType::Gemini)),
            ("OPENAI", Some(LLMProviderType::OpenAI)),
            ("chatgpt", Some(LLMProviderType::OpenAI)),
            ("gpt", Some(LLMProviderType::OpenAI)),
            ("claude", None),
        ];

        for (input, expected) in cases {
            assert_eq!(LLMProviderType::parse(input), expected, "input '{}'", input);
        }
    }

    #[tokio::test]
    async fn test_openai_token_count_unsupported() {
        let provider = OpenAIProvider::new("key".to_string(), None, None).unwrap();
        let err = provider.count_tokens("hello").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unsupported("OpenAI")));
    }
}
