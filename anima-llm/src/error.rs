//! Inference error types.

use thiserror::Error;

/// Errors from the language inference layer.
///
/// None of these reach the interactive path: callers log them and skip the
/// dependent state update.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("inference request failed: {0}")]
    RequestFailed(String),

    /// No JSON object could be recovered from the model output.
    #[error("failed to parse model output as JSON: {0}")]
    ParseError(String),

    /// JSON was found but lacks the fields the caller needs.
    #[error("model output schema validation failed: {0}")]
    SchemaValidation(String),

    /// Request timed out.
    #[error("inference request timed out after {0}ms")]
    Timeout(u64),

    /// No provider configured or the endpoint is unreachable.
    #[error("inference provider unavailable: {0}")]
    Unavailable(String),

    /// Every retry failed.
    #[error("all {attempts} inference attempts failed: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the final attempt.
        last_error: String,
    },

    /// Invalid provider settings or prompt templates.
    #[error("inference configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}
