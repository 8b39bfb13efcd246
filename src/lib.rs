pub mod api;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod prompts;

pub use config::Config;
pub use errors::*;
pub use extractor::{JsonResponseParser, ResponseExtractor};
pub use llm_providers::{GenerativeModel, LLMProvider, LLMProviderFactory, LLMProviderType};
pub use llm_service::LLMService;
pub use models::*;
