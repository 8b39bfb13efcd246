//! Pulls the JSON payload out of free-form model output.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::errors::GenerationError;

/// A ```json fence wrapping an object or an array. Non-greedy, spans lines.
static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*?\}|\[.*?\])\s*```").expect("fenced JSON pattern is valid")
});

/// A bare array of double-quoted strings anywhere in the text.
static BARE_STRING_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(\[\s*".*?"(?:,\s*".*?")*\])"#).expect("bare array pattern is valid")
});

/// Strategy for locating JSON inside a model reply.
pub trait ResponseExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Value, GenerationError>;
}

/// Regex extraction: a fenced ```json block first, then a bare array of
/// strings. Nested braces inside a fenced object and arrays of non-string
/// literals are not reliably matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Return the matched JSON text without parsing it.
    pub fn locate(text: &str) -> Option<&str> {
        FENCED_JSON
            .captures(text)
            .or_else(|| BARE_STRING_ARRAY.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl ResponseExtractor for JsonResponseParser {
    fn extract(&self, text: &str) -> Result<Value, GenerationError> {
        let candidate = Self::locate(text).ok_or_else(|| {
            GenerationError::generic("Failed to extract JSON: JSON block not found in response")
        })?;

        serde_json::from_str(candidate)
            .map_err(|e| GenerationError::generic(format!("Failed to parse JSON: {}", e)))
    }
}
