use anyhow::{Result, anyhow};
use std::env;
use tracing::{info, warn};

use crate::llm_providers::LLMProviderType;
use crate::llm_service::DEFAULT_INPUT_TOKEN_LIMIT;

// Import logging macros
use crate::{log_system_event, log_validation};

const PLACEHOLDER_API_KEY: &str = "your-api-key";

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LLMConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Generative service configuration
#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
    pub input_token_limit: u32,
    pub token_precheck: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables. Call `dotenvy::dotenv()`
    /// first if values should come from a `.env` file.
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            llm: LLMConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        };

        config.validate()?;

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            api_key_masked = %mask_sensitive_data(&self.llm.api_key),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            input_token_limit = self.llm.input_token_limit,
            token_precheck = self.llm.token_precheck,
            server_address = %self.server.address(),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    pub fn validate(&self) -> Result<()> {
        let key = self.llm.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            let error = anyhow!("GEMINI_API_KEY is missing or still set to a placeholder");
            log_validation!(failure, "configuration", error = error);
            return Err(error);
        }

        if self.llm.input_token_limit == 0 {
            return Err(anyhow!("LLM_INPUT_TOKEN_LIMIT must be greater than 0"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if !self.logging.file_enabled && !self.logging.console_enabled {
            warn!("Both console and file logging are disabled");
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl LLMConfig {
    fn from_env() -> Result<Self> {
        let api_key = non_blank_env("GEMINI_API_KEY")
            .or_else(|| non_blank_env("LLM_API_KEY"))
            .unwrap_or_default();

        let base_url = env::var("LLM_BASE_URL").ok().filter(|url| !url.trim().is_empty());

        let provider_str = env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = LLMProviderType::parse(&provider_str).unwrap_or_else(|| {
            info!("Unknown LLM provider '{}', defaulting to Gemini", provider_str);
            LLMProviderType::Gemini
        });

        let model = env::var("LLM_MODEL").ok().filter(|model| !model.trim().is_empty());

        let input_token_limit = match env::var("LLM_INPUT_TOKEN_LIMIT") {
            Ok(value) => value.trim().parse::<u32>().map_err(|_| {
                anyhow!("Invalid LLM_INPUT_TOKEN_LIMIT value: '{}'. Must be a positive integer", value)
            })?,
            Err(_) => DEFAULT_INPUT_TOKEN_LIMIT,
        };

        let token_precheck = parse_bool_env("LLM_TOKEN_PRECHECK", true);

        Ok(LLMConfig {
            api_key,
            base_url,
            provider,
            model,
            input_token_limit,
            token_precheck,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        LoggingConfig {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info,flashcards_ai=debug".to_string()),
            file_enabled: parse_bool_env("LOG_FILE_ENABLED", true),
            console_enabled: parse_bool_env("LOG_CONSOLE_ENABLED", true),
            log_directory: env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().to_lowercase().parse::<bool>().ok())
        .unwrap_or(default)
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}
